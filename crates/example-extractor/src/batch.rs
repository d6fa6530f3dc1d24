//! Serializable indexed-array datasets.
//!
//! Every example model converts to an [`IndexedDataset`]: named variables,
//! each with named dimensions and a flat payload, plus an integer `example`
//! index.  Single examples carry one index entry; [`concat_examples`]
//! stacks them along a leading `example` dimension to form a batch.
//! Numeric payloads are f32 (values are downcast before insertion), time
//! axes are i64 epoch seconds, channel lists are strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractorError, Result};

/// Flat payload of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    F32(Vec<f32>),
    I64(Vec<i64>),
    Str(Vec<String>),
}

impl ArrayData {
    fn len(&self) -> usize {
        match self {
            ArrayData::F32(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::Str(v) => v.len(),
        }
    }
}

/// One variable: named dims, shape, and a flat row-major payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArray {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub data: ArrayData,
}

impl NamedArray {
    fn new(name: &str, dims: &[&str], shape: &[usize], data: ArrayData) -> Result<Self> {
        if dims.len() != shape.len() {
            return Err(ExtractorError::invalid_metadata(format!(
                "variable '{name}': {} dims but {} shape entries",
                dims.len(),
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(ExtractorError::invalid_metadata(format!(
                "variable '{name}': shape {shape:?} implies {expected} elements, got {}",
                data.len()
            )));
        }
        Ok(Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            data,
        })
    }
}

/// A coordinate-indexed dataset: one example, or a batch of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDataset {
    /// Example index; one entry per example in the dataset.
    pub example: Vec<i32>,
    /// Named data variables.
    pub variables: BTreeMap<String, NamedArray>,
}

impl IndexedDataset {
    /// A dataset holding the single example `example_index`.
    pub fn single(example_index: i32) -> Self {
        Self {
            example: vec![example_index],
            variables: BTreeMap::new(),
        }
    }

    pub fn insert_f32(
        &mut self,
        name: &str,
        dims: &[&str],
        shape: &[usize],
        data: Vec<f32>,
    ) -> Result<()> {
        let array = NamedArray::new(name, dims, shape, ArrayData::F32(data))?;
        self.variables.insert(name.to_string(), array);
        Ok(())
    }

    pub fn insert_i64(
        &mut self,
        name: &str,
        dims: &[&str],
        shape: &[usize],
        data: Vec<i64>,
    ) -> Result<()> {
        let array = NamedArray::new(name, dims, shape, ArrayData::I64(data))?;
        self.variables.insert(name.to_string(), array);
        Ok(())
    }

    pub fn insert_str(
        &mut self,
        name: &str,
        dims: &[&str],
        shape: &[usize],
        data: Vec<String>,
    ) -> Result<()> {
        let array = NamedArray::new(name, dims, shape, ArrayData::Str(data))?;
        self.variables.insert(name.to_string(), array);
        Ok(())
    }

    pub fn array(&self, name: &str) -> Result<&NamedArray> {
        self.variables.get(name).ok_or_else(|| {
            ExtractorError::invalid_metadata(format!("dataset has no variable '{name}'"))
        })
    }

    pub fn f32s(&self, name: &str) -> Result<&[f32]> {
        match &self.array(name)?.data {
            ArrayData::F32(v) => Ok(v),
            _ => Err(ExtractorError::invalid_metadata(format!(
                "variable '{name}' is not f32"
            ))),
        }
    }

    pub fn i64s(&self, name: &str) -> Result<&[i64]> {
        match &self.array(name)?.data {
            ArrayData::I64(v) => Ok(v),
            _ => Err(ExtractorError::invalid_metadata(format!(
                "variable '{name}' is not i64"
            ))),
        }
    }

    pub fn strs(&self, name: &str) -> Result<&[String]> {
        match &self.array(name)?.data {
            ArrayData::Str(v) => Ok(v),
            _ => Err(ExtractorError::invalid_metadata(format!(
                "variable '{name}' is not a string array"
            ))),
        }
    }
}

/// Stack single-example datasets into one batch with a leading `example`
/// dimension on every variable.
///
/// All inputs must declare the same variables with identical shapes; the
/// batch index is assigned from input order.
pub fn concat_examples(examples: &[IndexedDataset]) -> Result<IndexedDataset> {
    let first = examples.first().ok_or_else(|| {
        ExtractorError::invalid_metadata("cannot concatenate an empty example list")
    })?;

    let mut batch = IndexedDataset {
        example: (0..examples.len() as i32).collect(),
        variables: BTreeMap::new(),
    };

    for (name, template) in &first.variables {
        let mut dims = vec!["example".to_string()];
        dims.extend(template.dims.iter().cloned());
        let mut shape = vec![examples.len()];
        shape.extend(template.shape.iter().copied());

        let mut data = match &template.data {
            ArrayData::F32(_) => ArrayData::F32(Vec::new()),
            ArrayData::I64(_) => ArrayData::I64(Vec::new()),
            ArrayData::Str(_) => ArrayData::Str(Vec::new()),
        };

        for example in examples {
            let array = example.array(name)?;
            if array.shape != template.shape {
                return Err(ExtractorError::invalid_metadata(format!(
                    "variable '{name}': example shapes differ ({:?} vs {:?})",
                    array.shape, template.shape
                )));
            }
            match (&mut data, &array.data) {
                (ArrayData::F32(out), ArrayData::F32(v)) => out.extend_from_slice(v),
                (ArrayData::I64(out), ArrayData::I64(v)) => out.extend_from_slice(v),
                (ArrayData::Str(out), ArrayData::Str(v)) => out.extend_from_slice(v),
                _ => {
                    return Err(ExtractorError::invalid_metadata(format!(
                        "variable '{name}': example payload types differ"
                    )))
                }
            }
        }

        batch.variables.insert(
            name.clone(),
            NamedArray {
                dims,
                shape,
                data,
            },
        );
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(i: i32, offset: f32) -> IndexedDataset {
        let mut ds = IndexedDataset::single(i);
        ds.insert_f32("data", &["time", "id"], &[2, 3], vec![offset; 6]).unwrap();
        ds.insert_i64("time", &["time"], &[2], vec![0, 300]).unwrap();
        ds
    }

    #[test]
    fn test_insert_rejects_shape_mismatch() {
        let mut ds = IndexedDataset::single(0);
        assert!(ds.insert_f32("data", &["time"], &[3], vec![1.0, 2.0]).is_err());
        assert!(ds.insert_f32("data", &["time"], &[2, 2], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_concat_examples() {
        let batch = concat_examples(&[example(0, 1.0), example(1, 2.0)]).unwrap();
        assert_eq!(batch.example, vec![0, 1]);

        let data = batch.array("data").unwrap();
        assert_eq!(data.dims, vec!["example", "time", "id"]);
        assert_eq!(data.shape, vec![2, 2, 3]);
        assert_eq!(batch.f32s("data").unwrap()[..6], [1.0; 6]);
        assert_eq!(batch.f32s("data").unwrap()[6..], [2.0; 6]);
    }

    #[test]
    fn test_concat_rejects_differing_shapes() {
        let mut other = IndexedDataset::single(1);
        other.insert_f32("data", &["time", "id"], &[2, 2], vec![0.0; 4]).unwrap();
        other.insert_i64("time", &["time"], &[2], vec![0, 300]).unwrap();
        assert!(concat_examples(&[example(0, 1.0), other]).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let ds = example(0, 3.5);
        let json = serde_json::to_string(&ds).unwrap();
        let restored: IndexedDataset = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ds);
    }
}
