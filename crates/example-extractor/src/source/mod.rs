//! Data source adapters.
//!
//! Each adapter wraps one Zarr group and extracts windowed training
//! examples from it.  Construction is cheap and holds only plain config
//! values; `open()` reads coordinate metadata and must be called in the
//! worker process that will use the adapter, after any fork.  An un-opened
//! adapter is safe to clone across workers.

mod gsp;
mod nwp;
mod pv;
mod satellite;

pub use gsp::GspSource;
pub use nwp::NwpSource;
pub use pv::PvSource;
pub use satellite::SatelliteSource;

use std::ops::Range;

use chrono::{DateTime, Duration, Utc};

use crate::error::{ExtractorError, Result};
use crate::model::{GspExample, NwpExample, PvExample, SatelliteExample};

pub const SATELLITE_SAMPLE_PERIOD_MINUTES: u32 = 5;
pub const NWP_SAMPLE_PERIOD_MINUTES: u32 = 60;
pub const PV_SAMPLE_PERIOD_MINUTES: u32 = 5;
pub const GSP_SAMPLE_PERIOD_MINUTES: u32 = 30;

/// One extracted example, tagged by source.
#[derive(Debug, Clone, PartialEq)]
pub enum Example {
    Satellite(SatelliteExample),
    Nwp(NwpExample),
    Pv(PvExample),
    Gsp(GspExample),
}

impl Example {
    /// Convert to the serializable indexed-array form.
    pub fn to_dataset(&self, example_index: i32) -> Result<crate::batch::IndexedDataset> {
        match self {
            Example::Satellite(e) => e.to_dataset(example_index),
            Example::Nwp(e) => e.to_dataset(example_index),
            Example::Pv(e) => e.to_dataset(example_index),
            Example::Gsp(e) => e.to_dataset(example_index),
        }
    }
}

/// Common interface over the four source adapters.
pub trait DataSource {
    /// Short name used in errors and logs.
    fn source_name(&self) -> &'static str;

    /// Open the backing store and load coordinate metadata.  Idempotent.
    fn open(&mut self) -> Result<()>;

    /// Native sampling period of the source.
    fn sample_period(&self) -> Duration;

    /// History duration included before the anchor.
    fn history_duration(&self) -> Duration;

    /// Forecast duration included after the anchor.
    fn forecast_duration(&self) -> Duration;

    /// Number of time steps per example (history + anchor + forecast).
    fn total_seq_len(&self) -> usize {
        let period = self.sample_period().num_minutes();
        (self.history_duration().num_minutes() / period
            + self.forecast_duration().num_minutes() / period
            + 1) as usize
    }

    /// Every timestamp at which this source has data.
    fn datetime_index(&self) -> Result<Vec<DateTime<Utc>>>;

    /// Extract the example anchored at `t0`, spatially centred on the
    /// OSGB coordinate (`x_center`, `y_center`).
    fn get_example(
        &self,
        t0: DateTime<Utc>,
        x_center: f64,
        y_center: f64,
    ) -> Result<Example>;
}

/// Index range of `times` entries inside the closed interval
/// `[start, end]`.  `times` must be ascending.
pub(crate) fn slice_time_window(
    times: &[DateTime<Utc>],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Range<usize> {
    let lo = times.partition_point(|t| *t < start);
    let hi = times.partition_point(|t| *t <= end);
    lo..hi
}

/// Canonicalize a spatial coordinate axis.
///
/// Returns the axis in the wanted direction and whether the stored order
/// had to be reversed; a flip is logged since callers must remap raw
/// indices when reading data.
pub(crate) fn canonical_axis(
    source: &'static str,
    name: &'static str,
    mut coords: Vec<f64>,
    want_ascending: bool,
) -> Result<(Vec<f64>, bool)> {
    if coords.len() < 2 {
        return Err(ExtractorError::invalid_metadata(format!(
            "{source}: coordinate axis '{name}' has fewer than 2 entries"
        )));
    }
    let ascending = coords[0] < coords[1];
    if ascending == want_ascending {
        return Ok((coords, false));
    }
    coords.reverse();
    tracing::warn!(source, name, "coordinate axis stored reversed; flipping");
    Ok((coords, true))
}

/// Map a canonical (possibly flipped) index range back to stored indices.
pub(crate) fn raw_range(canonical: &Range<usize>, axis_len: usize, flipped: bool) -> Range<usize> {
    if flipped {
        axis_len - canonical.end..axis_len - canonical.start
    } else {
        canonical.clone()
    }
}

/// Store-index of each wanted channel name.
pub(crate) fn channel_indices(
    source: &'static str,
    store_channels: &[String],
    wanted: &[String],
) -> Result<Vec<u64>> {
    wanted
        .iter()
        .map(|name| {
            store_channels
                .iter()
                .position(|c| c == name)
                .map(|i| i as u64)
                .ok_or_else(|| {
                    ExtractorError::invalid_metadata(format!(
                        "{source}: store has no channel '{name}' (available: {store_channels:?})"
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(s, 0).unwrap()
    }

    #[test]
    fn test_slice_time_window_is_closed_interval() {
        let times: Vec<_> = (0..10).map(|i| ts(i * 300)).collect();
        assert_eq!(slice_time_window(&times, ts(600), ts(1_200)), 2..5);
        assert_eq!(slice_time_window(&times, ts(601), ts(1_199)), 3..4);
        assert_eq!(slice_time_window(&times, ts(9_000), ts(9_600)), 10..10);
    }

    #[test]
    fn test_canonical_axis_flips_and_reports() {
        let (axis, flipped) =
            canonical_axis("satellite", "x", vec![0.0, 2_000.0, 4_000.0], true).unwrap();
        assert!(!flipped);
        assert_eq!(axis, vec![0.0, 2_000.0, 4_000.0]);

        let (axis, flipped) =
            canonical_axis("satellite", "y", vec![0.0, 2_000.0, 4_000.0], false).unwrap();
        assert!(flipped);
        assert_eq!(axis, vec![4_000.0, 2_000.0, 0.0]);
    }

    #[test]
    fn test_raw_range_round_trip() {
        // Canonical 1..3 of a reversed 5-long axis covers stored 2..4.
        assert_eq!(raw_range(&(1..3), 5, true), 2..4);
        assert_eq!(raw_range(&(1..3), 5, false), 1..3);
    }

    #[test]
    fn test_channel_indices() {
        let store: Vec<String> = ["HRV", "IR_016", "VIS006"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let wanted: Vec<String> = ["VIS006", "HRV"].iter().map(|s| s.to_string()).collect();
        assert_eq!(channel_indices("satellite", &store, &wanted).unwrap(), vec![2, 0]);
        let missing: Vec<String> = vec!["WV_062".to_string()];
        assert!(channel_indices("satellite", &store, &missing).is_err());
    }
}
