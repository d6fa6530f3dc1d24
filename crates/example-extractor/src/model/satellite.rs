//! Satellite example model.

use chrono::{DateTime, TimeZone, Utc};

use super::{check_axis_len, check_finite, warn_on_sentinel};
use crate::batch::IndexedDataset;
use crate::error::{ExtractorError, Result};

/// One satellite example: a `[time, y, x, channel]` image sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteExample {
    /// Image data, row-major over `[time, y, x, channel]`.
    pub data: Vec<f32>,
    pub time: Vec<DateTime<Utc>>,
    /// OSGB northing of each row, top-to-bottom (descending).
    pub y: Vec<f64>,
    /// OSGB easting of each column, left-to-right (ascending).
    pub x: Vec<f64>,
    pub channels: Vec<String>,
}

impl SatelliteExample {
    /// Construct and validate.
    ///
    /// Dimension ordering is `[time, y, x, channel]`; every coordinate
    /// array must match its data axis and the data must be finite.
    pub fn new(
        data: Vec<f32>,
        time: Vec<DateTime<Utc>>,
        y: Vec<f64>,
        x: Vec<f64>,
        channels: Vec<String>,
    ) -> Result<Self> {
        let expected = time.len() * y.len() * x.len() * channels.len();
        if expected == 0 {
            return Err(ExtractorError::validation(
                "satellite",
                "data",
                "every axis must be non-empty",
            ));
        }
        check_axis_len("satellite", "data", expected, data.len())?;
        check_finite("satellite", "data", &data)?;
        Ok(Self {
            data,
            time,
            y,
            x,
            channels,
        })
    }

    /// `[time, y, x, channel]` axis lengths.
    pub fn shape(&self) -> [usize; 4] {
        [
            self.time.len(),
            self.y.len(),
            self.x.len(),
            self.channels.len(),
        ]
    }

    /// Opt-in check for a sentinel value (e.g. `-1.0` marking missing
    /// pixels in some raw stores).  Logs and returns false on a hit.
    pub fn check_sentinel(&self, sentinel: f32) -> bool {
        warn_on_sentinel("satellite", "data", &self.data, sentinel)
    }

    /// Serializable indexed-array form, downcast to f32.
    pub fn to_dataset(&self, example_index: i32) -> Result<IndexedDataset> {
        let [n_time, n_y, n_x, n_chan] = self.shape();
        let mut ds = IndexedDataset::single(example_index);
        ds.insert_f32(
            "data",
            &["time", "y", "x", "channel"],
            &[n_time, n_y, n_x, n_chan],
            self.data.clone(),
        )?;
        ds.insert_i64(
            "time",
            &["time"],
            &[n_time],
            self.time.iter().map(|t| t.timestamp()).collect(),
        )?;
        ds.insert_f32("y", &["y"], &[n_y], self.y.iter().map(|v| *v as f32).collect())?;
        ds.insert_f32("x", &["x"], &[n_x], self.x.iter().map(|v| *v as f32).collect())?;
        ds.insert_str("channels", &["channel"], &[n_chan], self.channels.clone())?;
        Ok(ds)
    }

    /// Rebuild from the indexed-array form, re-running validation.
    pub fn from_dataset(ds: &IndexedDataset) -> Result<Self> {
        let time = ds
            .i64s("time")?
            .iter()
            .map(|s| {
                Utc.timestamp_opt(*s, 0).single().ok_or_else(|| {
                    ExtractorError::validation("satellite", "time", format!("bad epoch {s}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            ds.f32s("data")?.to_vec(),
            time,
            ds.f32s("y")?.iter().map(|v| *v as f64).collect(),
            ds.f32s("x")?.iter().map(|v| *v as f64).collect(),
            ds.strs("channels")?.to_vec(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> SatelliteExample {
        let time: Vec<_> = (0..3)
            .map(|i| Utc.timestamp_opt(1_600_000_000 + i * 300, 0).unwrap())
            .collect();
        let y = vec![4_000.0, 2_000.0];
        let x = vec![0.0, 2_000.0];
        let channels = vec!["HRV".to_string()];
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        SatelliteExample::new(data, time, y, x, channels).unwrap()
    }

    #[test]
    fn test_shape() {
        assert_eq!(example().shape(), [3, 2, 2, 1]);
    }

    #[test]
    fn test_nan_fails_validation() {
        let good = example();
        let mut data = good.data.clone();
        data[5] = f32::NAN;
        let err =
            SatelliteExample::new(data, good.time, good.y, good.x, good.channels).unwrap_err();
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_wrong_data_len_fails_validation() {
        let good = example();
        let mut data = good.data.clone();
        data.pop();
        assert!(SatelliteExample::new(data, good.time, good.y, good.x, good.channels).is_err());
    }

    #[test]
    fn test_dataset_round_trip() {
        let original = example();
        let ds = original.to_dataset(0).unwrap();
        let restored = SatelliteExample::from_dataset(&ds).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_sentinel_check() {
        let good = example();
        assert!(good.check_sentinel(-1.0));
        let mut data = good.data.clone();
        data[0] = -1.0;
        let flagged =
            SatelliteExample::new(data, good.time, good.y, good.x, good.channels).unwrap();
        assert!(!flagged.check_sentinel(-1.0));
    }
}
