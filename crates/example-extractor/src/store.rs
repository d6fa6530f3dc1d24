//! Thin access layer over a Zarr group on a filesystem store.
//!
//! Each data source is one Zarr group: a main f32 data array plus small
//! coordinate arrays (epoch-second times, OSGB metres, entity ids).  Only
//! the coordinate arrays are read eagerly; the data array handle is kept
//! for per-example subset retrieval so large stores are never loaded
//! whole.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::error::{ExtractorError, Result};

/// An open Zarr group.
#[derive(Clone)]
pub struct ZarrGroup {
    store: Arc<FilesystemStore>,
    path: String,
}

impl ZarrGroup {
    /// Open the group rooted at `path`.
    pub fn open(path: &str) -> Result<Self> {
        if !Path::new(path).is_dir() {
            return Err(ExtractorError::open_failed(format!(
                "no Zarr group at '{path}'"
            )));
        }
        let store = FilesystemStore::new(path)
            .map_err(|e| ExtractorError::open_failed(e.to_string()))?;
        tracing::debug!(path, "opened Zarr group");
        Ok(Self {
            store: Arc::new(store),
            path: path.to_string(),
        })
    }

    /// Path this group was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Open a named array within the group.
    pub fn array(&self, name: &str) -> Result<Array<FilesystemStore>> {
        Array::open(self.store.clone(), &format!("/{name}")).map_err(|e| {
            ExtractorError::open_failed(format!(
                "array '{name}' in '{}': {e}",
                self.path
            ))
        })
    }

    /// Read an entire coordinate array of f64 values.
    pub fn read_f64(&self, name: &str) -> Result<Vec<f64>> {
        let array = self.array(name)?;
        retrieve_all::<f64>(&array, name)
    }

    /// Read an entire coordinate array of i64 values.
    pub fn read_i64(&self, name: &str) -> Result<Vec<i64>> {
        let array = self.array(name)?;
        retrieve_all::<i64>(&array, name)
    }

    /// Read an entire coordinate array of f32 values.
    pub fn read_f32(&self, name: &str) -> Result<Vec<f32>> {
        let array = self.array(name)?;
        retrieve_all::<f32>(&array, name)
    }

    /// Read a time coordinate array stored as Unix epoch seconds.
    pub fn read_datetimes(&self, name: &str) -> Result<Vec<DateTime<Utc>>> {
        let seconds = self.read_i64(name)?;
        seconds
            .into_iter()
            .map(|s| {
                Utc.timestamp_opt(s, 0).single().ok_or_else(|| {
                    ExtractorError::invalid_metadata(format!(
                        "'{name}' contains an invalid epoch timestamp: {s}"
                    ))
                })
            })
            .collect()
    }
}

/// Retrieve every element of an array.
fn retrieve_all<T: zarrs::array::Element + zarrs::array::ElementOwned>(
    array: &Array<FilesystemStore>,
    name: &str,
) -> Result<Vec<T>> {
    let subset = ArraySubset::new_with_start_shape(
        vec![0; array.shape().len()],
        array.shape().to_vec(),
    )
    .map_err(|e| ExtractorError::read_failed(e.to_string()))?;
    array
        .retrieve_array_subset_elements::<T>(&subset)
        .map_err(|e| ExtractorError::read_failed(format!("array '{name}': {e}")))
}

/// Retrieve a subset of a data array as f32.
pub fn retrieve_f32_subset(
    array: &Array<FilesystemStore>,
    start: Vec<u64>,
    shape: Vec<u64>,
) -> Result<Vec<f32>> {
    let subset = ArraySubset::new_with_start_shape(start, shape)
        .map_err(|e| ExtractorError::read_failed(e.to_string()))?;
    array
        .retrieve_array_subset_elements::<f32>(&subset)
        .map_err(|e| ExtractorError::read_failed(e.to_string()))
}

/// Channel names declared in a data array's `"channels"` attribute.
pub fn channels_attr(array: &Array<FilesystemStore>) -> Result<Vec<String>> {
    let value = array.attributes().get("channels").ok_or_else(|| {
        ExtractorError::invalid_metadata("data array is missing the 'channels' attribute")
    })?;
    let names: Vec<String> = serde_json::from_value(value.clone())?;
    if names.is_empty() {
        return Err(ExtractorError::invalid_metadata(
            "'channels' attribute is empty",
        ));
    }
    Ok(names)
}

/// Deduplicate and order-repair a raw time axis.
///
/// Returns the repaired timestamps and, for each, its index into the raw
/// axis.  Duplicates and out-of-order entries are dropped (first
/// occurrence wins), matching the documented recovered-locally behavior:
/// raw stores do occasionally contain both.
pub fn repair_time_axis(
    source: &'static str,
    raw: &[DateTime<Utc>],
) -> Result<(Vec<DateTime<Utc>>, Vec<u64>)> {
    if raw.is_empty() {
        return Err(ExtractorError::invalid_metadata(format!(
            "{source}: time axis is empty"
        )));
    }

    let mut times = Vec::with_capacity(raw.len());
    let mut raw_indices = Vec::with_capacity(raw.len());
    for (i, &t) in raw.iter().enumerate() {
        if times.last().map_or(true, |&last| t > last) {
            times.push(t);
            raw_indices.push(i as u64);
        }
    }

    let n_dropped = raw.len() - times.len();
    if n_dropped > 0 {
        tracing::warn!(
            source,
            n_dropped,
            "time axis has duplicated or out-of-order entries; dropping them"
        );
    }
    Ok((times, raw_indices))
}
