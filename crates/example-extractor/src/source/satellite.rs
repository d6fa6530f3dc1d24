//! Satellite imagery source.
//!
//! Backed by a Zarr group holding a `[time, y, x, channel]` f32 array of
//! stacked EUMETSAT channels at 5-minute cadence on the OSGB grid.  Raw
//! stores are untrusted on two axes: timestamps occasionally repeat or go
//! backwards, and the spatial axes are sometimes written in the opposite
//! orientation.  Both are repaired at `open()` with a warning; examples
//! always come out x-ascending, y-descending.

use chrono::{DateTime, Duration, Utc};
use zarrs::array::Array;
use zarrs_filesystem::FilesystemStore;

use crate::config::ImageSourceConfig;
use crate::error::{ExtractorError, Result};
use crate::model::SatelliteExample;
use crate::store::{self, ZarrGroup};
use crate::window;

use super::{
    canonical_axis, channel_indices, raw_range, slice_time_window, DataSource, Example,
    SATELLITE_SAMPLE_PERIOD_MINUTES,
};

/// Satellite source adapter.
pub struct SatelliteSource {
    config: ImageSourceConfig,
    /// When set, `datetime_index()` keeps daylight timestamps only,
    /// judged at the corners of the stored extent.
    pub remove_night: bool,
    state: Option<State>,
}

struct State {
    data: Array<FilesystemStore>,
    time: Vec<DateTime<Utc>>,
    /// Raw store index of each repaired time entry.
    time_raw: Vec<u64>,
    /// Canonical descending northings.
    y: Vec<f64>,
    /// Canonical ascending eastings.
    x: Vec<f64>,
    y_flipped: bool,
    x_flipped: bool,
    /// Store channel index per configured channel, in output order.
    channel_indices: Vec<u64>,
}

impl SatelliteSource {
    pub fn new(config: ImageSourceConfig) -> Self {
        Self {
            config,
            remove_night: true,
            state: None,
        }
    }

    fn state(&self) -> Result<&State> {
        self.state
            .as_ref()
            .ok_or(ExtractorError::NotOpened { source_name: "satellite" })
    }
}

impl DataSource for SatelliteSource {
    fn source_name(&self) -> &'static str {
        "satellite"
    }

    fn open(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let group = ZarrGroup::open(&self.config.zarr_path)?;
        let data = group.array("data")?;

        let raw_time = group.read_datetimes("time")?;
        let (time, time_raw) = store::repair_time_axis("satellite", &raw_time)?;
        let (y, y_flipped) = canonical_axis("satellite", "y", group.read_f64("y")?, false)?;
        let (x, x_flipped) = canonical_axis("satellite", "x", group.read_f64("x")?, true)?;

        let store_channels = store::channels_attr(&data)?;
        let channel_indices =
            channel_indices("satellite", &store_channels, &self.config.channels)?;

        tracing::debug!(
            n_time = time.len(),
            n_y = y.len(),
            n_x = x.len(),
            n_channels = channel_indices.len(),
            "opened satellite source"
        );
        self.state = Some(State {
            data,
            time,
            time_raw,
            y,
            x,
            y_flipped,
            x_flipped,
            channel_indices,
        });
        Ok(())
    }

    fn sample_period(&self) -> Duration {
        Duration::minutes(SATELLITE_SAMPLE_PERIOD_MINUTES as i64)
    }

    fn history_duration(&self) -> Duration {
        Duration::minutes(self.config.history_minutes as i64)
    }

    fn forecast_duration(&self) -> Duration {
        Duration::minutes(self.config.forecast_minutes as i64)
    }

    fn datetime_index(&self) -> Result<Vec<DateTime<Utc>>> {
        let state = self.state()?;
        if !self.remove_night {
            return Ok(state.time.clone());
        }
        // Judge daylight at the four corners of the stored extent: if the
        // sun is below the threshold at all of them, the whole area is dark.
        let (x_min, x_max) = (state.x[0], state.x[state.x.len() - 1]);
        let (y_max, y_min) = (state.y[0], state.y[state.y.len() - 1]);
        let corners = [
            (x_min, y_min),
            (x_min, y_max),
            (x_max, y_min),
            (x_max, y_max),
        ];
        Ok(nowcast_common::sun::select_daylight_datetimes(
            &state.time,
            &corners,
        ))
    }

    fn get_example(
        &self,
        t0: DateTime<Utc>,
        x_center: f64,
        y_center: f64,
    ) -> Result<Example> {
        let state = self.state()?;
        let start = t0 - self.history_duration();
        let end = t0 + self.forecast_duration();

        let t_range = slice_time_window(&state.time, start, end);
        let y_range =
            window::window_indices(&state.y, y_center, self.config.image_size_pixels, 'y')?;
        let x_range =
            window::window_indices(&state.x, x_center, self.config.image_size_pixels, 'x')?;
        let (sy, sx) = (y_range.len(), x_range.len());
        let n_chan = self.config.channels.len();

        let expected_time = self.total_seq_len();
        if t_range.len() != expected_time {
            return Err(ExtractorError::ShapeMismatch {
                source_name: "satellite",
                t0,
                x_center,
                y_center,
                expected: vec![expected_time, sy, sx, n_chan],
                actual: vec![t_range.len(), sy, sx, n_chan],
            });
        }

        let ry = raw_range(&y_range, state.y.len(), state.y_flipped);
        let rx = raw_range(&x_range, state.x.len(), state.x_flipped);
        let n_chan_store = state.data.shape()[3] as usize;

        // One chunk-aligned read per time step; channel selection and axis
        // un-flipping happen in memory on the small window.
        let mut data = Vec::with_capacity(expected_time * sy * sx * n_chan);
        for ti in t_range.clone() {
            let block = store::retrieve_f32_subset(
                &state.data,
                vec![state.time_raw[ti], ry.start as u64, rx.start as u64, 0],
                vec![1, sy as u64, sx as u64, n_chan_store as u64],
            )?;
            for iy in 0..sy {
                let by = if state.y_flipped { sy - 1 - iy } else { iy };
                for ix in 0..sx {
                    let bx = if state.x_flipped { sx - 1 - ix } else { ix };
                    let base = (by * sx + bx) * n_chan_store;
                    for &ch in &state.channel_indices {
                        data.push(block[base + ch as usize]);
                    }
                }
            }
        }

        let example = SatelliteExample::new(
            data,
            state.time[t_range].to_vec(),
            state.y[y_range].to_vec(),
            state.x[x_range].to_vec(),
            self.config.channels.clone(),
        )?;
        Ok(Example::Satellite(example))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use chrono::TimeZone;

    fn open_source(dir: &std::path::Path) -> SatelliteSource {
        testdata::write_satellite_store(dir).unwrap();
        let mut config =
            ImageSourceConfig::satellite_defaults(dir.to_str().unwrap());
        config.history_minutes = 10;
        config.forecast_minutes = 10;
        config.image_size_pixels = 4;
        config.channels = vec!["IR_016".to_string(), "HRV".to_string()];
        let mut source = SatelliteSource::new(config);
        source.open().unwrap();
        source
    }

    #[test]
    fn test_not_opened_errors() {
        let source =
            SatelliteSource::new(ImageSourceConfig::satellite_defaults("unused.zarr"));
        assert!(matches!(
            source.datetime_index(),
            Err(ExtractorError::NotOpened { source_name: "satellite" })
        ));
    }

    #[test]
    fn test_get_example_shape_and_coords() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_source(dir.path());
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 12, 30, 0).unwrap();

        let Example::Satellite(example) = source.get_example(t0, 8_000.0, 8_000.0).unwrap()
        else {
            panic!("wrong variant");
        };

        assert_eq!(example.shape(), [5, 4, 4, 2]);
        assert_eq!(example.time[0], t0 - Duration::minutes(10));
        assert_eq!(example.time[4], t0 + Duration::minutes(10));
        // y comes out descending even though the store is ascending.
        assert_eq!(example.y, vec![14_000.0, 12_000.0, 10_000.0, 8_000.0]);
        assert_eq!(example.x, vec![2_000.0, 4_000.0, 6_000.0, 8_000.0]);
    }

    #[test]
    fn test_get_example_values_match_store_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_source(dir.path());
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 12, 30, 0).unwrap();

        let Example::Satellite(example) = source.get_example(t0, 8_000.0, 8_000.0).unwrap()
        else {
            panic!("wrong variant");
        };

        // Config channel order is [IR_016, HRV] = store channels [1, 0].
        let store_channel = [1usize, 0];
        let [n_time, n_y, n_x, n_chan] = example.shape();
        for it in 0..n_time {
            // Window starts 10 minutes (2 steps) before t0 at step 6.
            let t_store = 4 + it;
            for iy in 0..n_y {
                let y_store = (example.y[iy] / 2_000.0) as usize;
                for ix in 0..n_x {
                    let x_store = (example.x[ix] / 2_000.0) as usize;
                    for ic in 0..n_chan {
                        let got = example.data
                            [((it * n_y + iy) * n_x + ix) * n_chan + ic];
                        let want = testdata::satellite_value(
                            t_store,
                            y_store,
                            x_store,
                            store_channel[ic],
                        );
                        assert_eq!(got, want, "t={it} y={iy} x={ix} c={ic}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_window_near_edge_fails_with_axis() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_source(dir.path());
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 12, 30, 0).unwrap();
        let err = source.get_example(t0, 0.0, 8_000.0).unwrap_err();
        assert!(matches!(err, ExtractorError::WindowOutOfBounds { axis: 'x', .. }));
    }

    #[test]
    fn test_incomplete_time_window_is_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_source(dir.path());
        // First stored time; no history available before it.
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
        let err = source.get_example(t0, 8_000.0, 8_000.0).unwrap_err();
        assert!(matches!(err, ExtractorError::ShapeMismatch { source_name: "satellite", .. }));
    }

    #[test]
    fn test_midday_index_survives_daylight_filter() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_source(dir.path());
        assert!(source.remove_night);
        // The store covers 12:00-14:00 UTC on a winter day; all daylight.
        let index = source.datetime_index().unwrap();
        assert_eq!(index.len(), 25);
    }
}
