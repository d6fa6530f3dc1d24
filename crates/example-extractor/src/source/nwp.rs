//! Numerical weather prediction source.
//!
//! Backed by a Zarr group holding a `[channel, init_time, step, y, x]` f32
//! array of forecast runs.  A run initialized at `init_time` predicts the
//! instants `init_time + step` for each step hour, so the usable timestamps
//! are the flattened targets of every run, and extracting an example means
//! picking the freshest run that covers the window.

use chrono::{DateTime, Duration, DurationRound, Utc};
use zarrs::array::Array;
use zarrs_filesystem::FilesystemStore;

use crate::config::ImageSourceConfig;
use crate::error::{ExtractorError, Result};
use crate::model::NwpExample;
use crate::store::{self, ZarrGroup};
use crate::window;

use super::{
    canonical_axis, channel_indices, raw_range, DataSource, Example, NWP_SAMPLE_PERIOD_MINUTES,
};

/// NWP source adapter.
pub struct NwpSource {
    config: ImageSourceConfig,
    state: Option<State>,
}

struct State {
    data: Array<FilesystemStore>,
    init_time: Vec<DateTime<Utc>>,
    init_raw: Vec<u64>,
    /// Forecast horizons in hours, ascending.
    steps: Vec<i64>,
    y: Vec<f64>,
    x: Vec<f64>,
    y_flipped: bool,
    x_flipped: bool,
    channel_indices: Vec<u64>,
}

impl NwpSource {
    pub fn new(config: ImageSourceConfig) -> Self {
        Self { config, state: None }
    }

    fn state(&self) -> Result<&State> {
        self.state
            .as_ref()
            .ok_or(ExtractorError::NotOpened { source_name: "nwp" })
    }
}

impl DataSource for NwpSource {
    fn source_name(&self) -> &'static str {
        "nwp"
    }

    fn open(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let group = ZarrGroup::open(&self.config.zarr_path)?;
        let data = group.array("data")?;

        let raw_init = group.read_datetimes("init_time")?;
        let (init_time, init_raw) = store::repair_time_axis("nwp", &raw_init)?;
        let steps = group.read_i64("step")?;
        if !steps.windows(2).all(|w| w[0] < w[1]) {
            return Err(ExtractorError::invalid_metadata(
                "nwp: 'step' axis must be strictly increasing",
            ));
        }
        let (y, y_flipped) = canonical_axis("nwp", "y", group.read_f64("y")?, false)?;
        let (x, x_flipped) = canonical_axis("nwp", "x", group.read_f64("x")?, true)?;

        let store_channels = store::channels_attr(&data)?;
        let channel_indices = channel_indices("nwp", &store_channels, &self.config.channels)?;

        tracing::debug!(
            n_init = init_time.len(),
            n_step = steps.len(),
            n_y = y.len(),
            n_x = x.len(),
            "opened nwp source"
        );
        self.state = Some(State {
            data,
            init_time,
            init_raw,
            steps,
            y,
            x,
            y_flipped,
            x_flipped,
            channel_indices,
        });
        Ok(())
    }

    fn sample_period(&self) -> Duration {
        Duration::minutes(NWP_SAMPLE_PERIOD_MINUTES as i64)
    }

    fn history_duration(&self) -> Duration {
        Duration::minutes(self.config.history_minutes as i64)
    }

    fn forecast_duration(&self) -> Duration {
        Duration::minutes(self.config.forecast_minutes as i64)
    }

    /// Unique, sorted target times across every forecast run.
    fn datetime_index(&self) -> Result<Vec<DateTime<Utc>>> {
        let state = self.state()?;
        let targets: std::collections::BTreeSet<DateTime<Utc>> = state
            .init_time
            .iter()
            .flat_map(|&init| state.steps.iter().map(move |&h| init + Duration::hours(h)))
            .collect();
        Ok(targets.into_iter().collect())
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

        // Forecast steps are hourly, so the window start is floored to the
        // previous whole hour; the end stays exact so every anchor yields
        // the same number of target times.
        let hour = Duration::hours(1);
        let start_floor = start
            .duration_trunc(hour)
            .map_err(|e| ExtractorError::read_failed(e.to_string()))?;

        // The freshest run initialized at or before the window start.
        let n_init = state.init_time.partition_point(|t| *t <= start_floor);
        if n_init == 0 {
            return Err(ExtractorError::read_failed(format!(
                "nwp: no forecast run initialized at or before {start_floor}"
            )));
        }
        let init_idx = n_init - 1;
        let init = state.init_time[init_idx];

        // Re-index by target time and slice to the window.
        let step_lo = state
            .steps
            .partition_point(|&h| init + Duration::hours(h) < start_floor);
        let step_hi = state
            .steps
            .partition_point(|&h| init + Duration::hours(h) <= end);

        let y_range =
            window::window_indices(&state.y, y_center, self.config.image_size_pixels, 'y')?;
        let x_range =
            window::window_indices(&state.x, x_center, self.config.image_size_pixels, 'x')?;
        let (sy, sx) = (y_range.len(), x_range.len());
        let n_chan = self.config.channels.len();

        let n_time = step_hi.saturating_sub(step_lo);
        let expected_time = self.total_seq_len();
        if n_time != expected_time {
            return Err(ExtractorError::ShapeMismatch {
                source_name: "nwp",
                t0,
                x_center,
                y_center,
                expected: vec![n_chan, expected_time, sy, sx],
                actual: vec![n_chan, n_time, sy, sx],
            });
        }

        let ry = raw_range(&y_range, state.y.len(), state.y_flipped);
        let rx = raw_range(&x_range, state.x.len(), state.x_flipped);

        // One read per channel covering the whole contiguous step range.
        let mut data = Vec::with_capacity(n_chan * n_time * sy * sx);
        for &ch in &state.channel_indices {
            let block = store::retrieve_f32_subset(
                &state.data,
                vec![
                    ch,
                    state.init_raw[init_idx],
                    step_lo as u64,
                    ry.start as u64,
                    rx.start as u64,
                ],
                vec![1, 1, n_time as u64, sy as u64, sx as u64],
            )?;
            for it in 0..n_time {
                for iy in 0..sy {
                    let by = if state.y_flipped { sy - 1 - iy } else { iy };
                    for ix in 0..sx {
                        let bx = if state.x_flipped { sx - 1 - ix } else { ix };
                        data.push(block[(it * sy + by) * sx + bx]);
                    }
                }
            }
        }

        let target_time: Vec<DateTime<Utc>> = state.steps[step_lo..step_hi]
            .iter()
            .map(|&h| init + Duration::hours(h))
            .collect();

        let example = NwpExample::new(
            data,
            target_time,
            init,
            state.y[y_range].to_vec(),
            state.x[x_range].to_vec(),
            self.config.channels.clone(),
        )?;
        Ok(Example::Nwp(example))
    }
}
