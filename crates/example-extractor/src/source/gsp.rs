//! Grid supply point source.
//!
//! Backed by a Zarr group holding a `[time, gsp_id]` f32 array of
//! half-hourly solar yields plus centroid coordinates per GSP.  The GSP
//! whose centroid is nearest the requested centre anchors the example and
//! always comes first; the other GSPs inside the region of interest
//! follow, nearest-first, padded to the configured cardinality.

use chrono::{DateTime, Duration, Utc};
use zarrs::array::Array;
use zarrs_filesystem::FilesystemStore;

use crate::config::PointSourceConfig;
use crate::error::{ExtractorError, Result};
use crate::model::GspExample;
use crate::store::{self, ZarrGroup};

use super::{slice_time_window, DataSource, Example, GSP_SAMPLE_PERIOD_MINUTES};

/// GSP source adapter.
pub struct GspSource {
    config: PointSourceConfig,
    state: Option<State>,
}

struct State {
    gsp_yield: Array<FilesystemStore>,
    time: Vec<DateTime<Utc>>,
    time_raw: Vec<u64>,
    ids: Vec<i64>,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl GspSource {
    pub fn new(config: PointSourceConfig) -> Self {
        Self { config, state: None }
    }

    fn state(&self) -> Result<&State> {
        self.state
            .as_ref()
            .ok_or(ExtractorError::NotOpened { source_name: "gsp" })
    }
}

impl DataSource for GspSource {
    fn source_name(&self) -> &'static str {
        "gsp"
    }

    fn open(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let group = ZarrGroup::open(&self.config.zarr_path)?;
        let gsp_yield = group.array("gsp_yield")?;

        let raw_time = group.read_datetimes("time")?;
        let (time, time_raw) = store::repair_time_axis("gsp", &raw_time)?;
        let ids = group.read_i64("gsp_id")?;
        let x = group.read_f64("x")?;
        let y = group.read_f64("y")?;
        if x.len() != ids.len() || y.len() != ids.len() {
            return Err(ExtractorError::invalid_metadata(format!(
                "gsp: centroid arrays have {}/{} entries for {} GSPs",
                x.len(),
                y.len(),
                ids.len()
            )));
        }

        tracing::debug!(n_time = time.len(), n_gsps = ids.len(), "opened gsp source");
        self.state = Some(State {
            gsp_yield,
            time,
            time_raw,
            ids,
            x,
            y,
        });
        Ok(())
    }

    fn sample_period(&self) -> Duration {
        Duration::minutes(GSP_SAMPLE_PERIOD_MINUTES as i64)
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
                source_name: "gsp",
                t0,
                x_center,
                y_center,
                expected: vec![expected_time],
                actual: vec![t_range.len()],
            });
        }

        let distance_sq = |i: usize| {
            (state.x[i] - x_center).powi(2) + (state.y[i] - y_center).powi(2)
        };

        // The anchor GSP is the nearest centroid regardless of distance;
        // the rest must fall inside the region of interest.
        let center_idx = (0..state.ids.len())
            .min_by(|&a, &b| {
                distance_sq(a)
                    .partial_cmp(&distance_sq(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| ExtractorError::invalid_metadata("gsp: store has no GSPs"))?;
        let half = self.config.roi_half_width_meters;
        let mut selected: Vec<usize> = (0..state.ids.len())
            .filter(|&i| {
                i == center_idx
                    || ((state.x[i] - x_center).abs() <= half
                        && (state.y[i] - y_center).abs() <= half)
            })
            .collect();

        let n_ids = state.ids.len();
        let mut rows = Vec::with_capacity(expected_time * n_ids);
        for ti in t_range.clone() {
            let row = store::retrieve_f32_subset(
                &state.gsp_yield,
                vec![state.time_raw[ti], 0],
                vec![1, n_ids as u64],
            )?;
            rows.extend(row);
        }

        let n_candidates = selected.len();
        selected.retain(|&i| (0..expected_time).all(|t| !rows[t * n_ids + i].is_nan()));
        let n_dropped = n_candidates - selected.len();
        if n_dropped > 0 {
            tracing::debug!(n_dropped, t0 = %t0, "dropped GSPs with missing yields");
        }
        if selected.is_empty() {
            return Err(ExtractorError::read_failed(format!(
                "gsp: no GSPs with complete yields around ({x_center}, {y_center}) at {t0}"
            )));
        }

        selected.sort_by(|&a, &b| {
            distance_sq(a)
                .partial_cmp(&distance_sq(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        selected.truncate(self.config.n_entities_per_example);

        let rows = rows.as_slice();
        let gsp_yield: Vec<f32> = (0..expected_time)
            .flat_map(|t| selected.iter().map(move |&i| rows[t * n_ids + i]))
            .collect();
        let example = GspExample::new(
            gsp_yield,
            state.time[t_range].to_vec(),
            selected.iter().map(|&i| state.ids[i]).collect(),
            selected.iter().map(|&i| state.x[i]).collect(),
            selected.iter().map(|&i| state.y[i]).collect(),
        )?;
        let example = example.pad(self.config.n_entities_per_example)?;
        Ok(Example::Gsp(example))
    }
}
