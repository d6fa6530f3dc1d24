//! PV system source.
//!
//! Backed by a Zarr group holding a `[time, id]` f32 array of per-system
//! power readings at 5-minute cadence, plus per-system metadata (capacity
//! and OSGB location).  An example takes the systems inside the region of
//! interest around the requested centre, drops systems with missing
//! readings in the window, orders the remainder nearest-first and pads up
//! to the configured cardinality.

use chrono::{DateTime, Duration, Utc};
use zarrs::array::Array;
use zarrs_filesystem::FilesystemStore;

use crate::config::PointSourceConfig;
use crate::error::{ExtractorError, Result};
use crate::model::PvExample;
use crate::store::{self, ZarrGroup};

use super::{slice_time_window, DataSource, Example, PV_SAMPLE_PERIOD_MINUTES};

/// PV source adapter.
pub struct PvSource {
    config: PointSourceConfig,
    state: Option<State>,
}

struct State {
    power: Array<FilesystemStore>,
    time: Vec<DateTime<Utc>>,
    time_raw: Vec<u64>,
    ids: Vec<i64>,
    capacity_mwp: Vec<f32>,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl PvSource {
    pub fn new(config: PointSourceConfig) -> Self {
        Self { config, state: None }
    }

    fn state(&self) -> Result<&State> {
        self.state
            .as_ref()
            .ok_or(ExtractorError::NotOpened { source_name: "pv" })
    }
}

impl DataSource for PvSource {
    fn source_name(&self) -> &'static str {
        "pv"
    }

    fn open(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let group = ZarrGroup::open(&self.config.zarr_path)?;
        let power = group.array("power_mw")?;

        let raw_time = group.read_datetimes("time")?;
        let (time, time_raw) = store::repair_time_axis("pv", &raw_time)?;
        let ids = group.read_i64("id")?;
        let capacity_mwp = group.read_f32("capacity_mwp")?;
        let x = group.read_f64("x")?;
        let y = group.read_f64("y")?;
        for (name, len) in [("capacity_mwp", capacity_mwp.len()), ("x", x.len()), ("y", y.len())] {
            if len != ids.len() {
                return Err(ExtractorError::invalid_metadata(format!(
                    "pv: '{name}' has {len} entries for {} systems",
                    ids.len()
                )));
            }
        }

        tracing::debug!(n_time = time.len(), n_systems = ids.len(), "opened pv source");
        self.state = Some(State {
            power,
            time,
            time_raw,
            ids,
            capacity_mwp,
            x,
            y,
        });
        Ok(())
    }

    fn sample_period(&self) -> Duration {
        Duration::minutes(PV_SAMPLE_PERIOD_MINUTES as i64)
    }

    fn history_duration(&self) -> Duration {
        Duration::minutes(self.config.history_minutes as i64)
    }

    fn forecast_duration(&self) -> Duration {
        Duration::minutes(self.config.forecast_minutes as i64)
    }

    fn datetime_index(&self) -> Result<Vec<DateTime<Utc>>> {
        Ok(self.state()?.time.clone())
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
        let expected_time = self.total_seq_len();
        if t_range.len() != expected_time {
            return Err(ExtractorError::ShapeMismatch {
                source_name: "pv",
                t0,
                x_center,
                y_center,
                expected: vec![expected_time],
                actual: vec![t_range.len()],
            });
        }

        // Systems inside the square region of interest.
        let half = self.config.roi_half_width_meters;
        let mut selected: Vec<usize> = (0..state.ids.len())
            .filter(|&i| {
                (state.x[i] - x_center).abs() <= half && (state.y[i] - y_center).abs() <= half
            })
            .collect();
        if selected.is_empty() {
            return Err(ExtractorError::read_failed(format!(
                "pv: no systems within {half} m of ({x_center}, {y_center})"
            )));
        }

        // One row per time step, all systems; the window is narrow.
        let n_ids = state.ids.len();
        let mut rows = Vec::with_capacity(expected_time * n_ids);
        for ti in t_range.clone() {
            let row = store::retrieve_f32_subset(
                &state.power,
                vec![state.time_raw[ti], 0],
                vec![1, n_ids as u64],
            )?;
            rows.extend(row);
        }

        // Systems with any missing reading in the window cannot be used.
        let n_candidates = selected.len();
        selected.retain(|&i| (0..expected_time).all(|t| !rows[t * n_ids + i].is_nan()));
        let n_dropped = n_candidates - selected.len();
        if n_dropped > 0 {
            tracing::debug!(n_dropped, t0 = %t0, "dropped pv systems with missing readings");
        }
        if selected.is_empty() {
            return Err(ExtractorError::read_failed(format!(
                "pv: no systems with complete readings around ({x_center}, {y_center}) at {t0}"
            )));
        }

        // Nearest system first.
        let distance_sq = |i: usize| {
            (state.x[i] - x_center).powi(2) + (state.y[i] - y_center).powi(2)
        };
        selected.sort_by(|&a, &b| {
            distance_sq(a)
                .partial_cmp(&distance_sq(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        selected.truncate(self.config.n_entities_per_example);

        let rows = rows.as_slice();
        let power_mw: Vec<f32> = (0..expected_time)
            .flat_map(|t| selected.iter().map(move |&i| rows[t * n_ids + i]))
            .collect();
        let example = PvExample::new(
            power_mw,
            state.time[t_range].to_vec(),
            selected.iter().map(|&i| state.ids[i]).collect(),
            selected.iter().map(|&i| state.capacity_mwp[i]).collect(),
            selected.iter().map(|&i| state.x[i]).collect(),
            selected.iter().map(|&i| state.y[i]).collect(),
        )?;
        let example = example.pad(self.config.n_entities_per_example)?;
        Ok(Example::Pv(example))
    }
}
