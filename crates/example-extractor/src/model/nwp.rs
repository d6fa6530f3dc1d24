//! NWP example model.
//!
//! Unlike satellite, NWP data is channel-first: `[channel, time, y, x]`.
//! The example also carries the forecast initialization time, since the
//! quality of an NWP value depends on how stale the forecast was.

use chrono::{DateTime, TimeZone, Utc};

use super::{check_axis_len, check_finite};
use crate::batch::IndexedDataset;
use crate::error::{ExtractorError, Result};

/// One NWP example: a `[channel, time, y, x]` forecast sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct NwpExample {
    /// Forecast data, row-major over `[channel, time, y, x]`.
    pub data: Vec<f32>,
    /// The times the forecasts are about.
    pub target_time: Vec<DateTime<Utc>>,
    /// When the forecast run was initialized.
    pub init_time: DateTime<Utc>,
    /// OSGB northing per row, top-to-bottom.
    pub y: Vec<f64>,
    /// OSGB easting per column, left-to-right.
    pub x: Vec<f64>,
    pub channels: Vec<String>,
}

impl NwpExample {
    pub fn new(
        data: Vec<f32>,
        target_time: Vec<DateTime<Utc>>,
        init_time: DateTime<Utc>,
        y: Vec<f64>,
        x: Vec<f64>,
        channels: Vec<String>,
    ) -> Result<Self> {
        let expected = channels.len() * target_time.len() * y.len() * x.len();
        if expected == 0 {
            return Err(ExtractorError::validation(
                "nwp",
                "data",
                "every axis must be non-empty",
            ));
        }
        check_axis_len("nwp", "data", expected, data.len())?;
        check_finite("nwp", "data", &data)?;
        Ok(Self {
            data,
            target_time,
            init_time,
            y,
            x,
            channels,
        })
    }

    /// `[channel, time, y, x]` axis lengths.
    pub fn shape(&self) -> [usize; 4] {
        [
            self.channels.len(),
            self.target_time.len(),
            self.y.len(),
            self.x.len(),
        ]
    }

    pub fn to_dataset(&self, example_index: i32) -> Result<IndexedDataset> {
        let [n_chan, n_time, n_y, n_x] = self.shape();
        let mut ds = IndexedDataset::single(example_index);
        ds.insert_f32(
            "data",
            &["channel", "time", "y", "x"],
            &[n_chan, n_time, n_y, n_x],
            self.data.clone(),
        )?;
        ds.insert_i64(
            "target_time",
            &["time"],
            &[n_time],
            self.target_time.iter().map(|t| t.timestamp()).collect(),
        )?;
        ds.insert_i64("init_time", &["init_time"], &[1], vec![self.init_time.timestamp()])?;
        ds.insert_f32("y", &["y"], &[n_y], self.y.iter().map(|v| *v as f32).collect())?;
        ds.insert_f32("x", &["x"], &[n_x], self.x.iter().map(|v| *v as f32).collect())?;
        ds.insert_str("channels", &["channel"], &[n_chan], self.channels.clone())?;
        Ok(ds)
    }

    pub fn from_dataset(ds: &IndexedDataset) -> Result<Self> {
        let parse = |s: i64| {
            Utc.timestamp_opt(s, 0).single().ok_or_else(|| {
                ExtractorError::validation("nwp", "target_time", format!("bad epoch {s}"))
            })
        };
        let target_time = ds
            .i64s("target_time")?
            .iter()
            .map(|s| parse(*s))
            .collect::<Result<Vec<_>>>()?;
        let init_time = parse(
            *ds.i64s("init_time")?
                .first()
                .ok_or_else(|| ExtractorError::validation("nwp", "init_time", "empty"))?,
        )?;
        Self::new(
            ds.f32s("data")?.to_vec(),
            target_time,
            init_time,
            ds.f32s("y")?.iter().map(|v| *v as f64).collect(),
            ds.f32s("x")?.iter().map(|v| *v as f64).collect(),
            ds.strs("channels")?.to_vec(),
        )
    }
}
