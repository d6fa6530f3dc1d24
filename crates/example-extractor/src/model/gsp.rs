//! GSP example model.

use chrono::{DateTime, TimeZone, Utc};

use super::{check_axis_len, check_finite, check_non_negative};
use crate::batch::IndexedDataset;
use crate::error::{ExtractorError, Result};

/// Entity id marking a padded (absent) grid supply point.
pub const PAD_GSP_ID: i64 = -1;

/// One GSP example: `[time, gsp]` solar yield for the grid supply points
/// in the region of interest, centre GSP first.
#[derive(Debug, Clone, PartialEq)]
pub struct GspExample {
    /// Solar yield, row-major over `[time, gsp]`.
    pub gsp_yield: Vec<f32>,
    pub time: Vec<DateTime<Utc>>,
    pub gsp_id: Vec<i64>,
    /// OSGB easting of each GSP centroid.
    pub gsp_x_coords: Vec<f64>,
    /// OSGB northing of each GSP centroid.
    pub gsp_y_coords: Vec<f64>,
}

impl GspExample {
    /// Construct and validate: finite, non-negative yield; id and
    /// centroid arrays matching the GSP axis.
    pub fn new(
        gsp_yield: Vec<f32>,
        time: Vec<DateTime<Utc>>,
        gsp_id: Vec<i64>,
        gsp_x_coords: Vec<f64>,
        gsp_y_coords: Vec<f64>,
    ) -> Result<Self> {
        let n_gsps = gsp_id.len();
        if time.is_empty() || n_gsps == 0 {
            return Err(ExtractorError::validation(
                "gsp",
                "gsp_yield",
                "time and gsp axes must be non-empty",
            ));
        }
        check_axis_len("gsp", "gsp_yield", time.len() * n_gsps, gsp_yield.len())?;
        check_axis_len("gsp", "gsp_x_coords", n_gsps, gsp_x_coords.len())?;
        check_axis_len("gsp", "gsp_y_coords", n_gsps, gsp_y_coords.len())?;
        check_finite("gsp", "gsp_yield", &gsp_yield)?;
        check_non_negative("gsp", "gsp_yield", &gsp_yield)?;
        Ok(Self {
            gsp_yield,
            time,
            gsp_id,
            gsp_x_coords,
            gsp_y_coords,
        })
    }

    /// `[time, gsp]` axis lengths.
    pub fn shape(&self) -> [usize; 2] {
        [self.time.len(), self.gsp_id.len()]
    }

    /// Pad the GSP axis up to `n_gsps` with zero yield, zero centroid
    /// coordinates and [`PAD_GSP_ID`] ids.
    pub fn pad(&self, n_gsps: usize) -> Result<Self> {
        let [n_time, n_current] = self.shape();
        if n_current > n_gsps {
            return Err(ExtractorError::validation(
                "gsp",
                "gsp_id",
                format!("cannot pad {n_current} GSPs down to {n_gsps}"),
            ));
        }

        let mut gsp_yield = Vec::with_capacity(n_time * n_gsps);
        for t in 0..n_time {
            gsp_yield.extend_from_slice(&self.gsp_yield[t * n_current..(t + 1) * n_current]);
            gsp_yield.extend(std::iter::repeat(0.0).take(n_gsps - n_current));
        }

        let pad = n_gsps - n_current;
        let mut ids = self.gsp_id.clone();
        ids.extend(std::iter::repeat(PAD_GSP_ID).take(pad));
        let mut x_coords = self.gsp_x_coords.clone();
        x_coords.extend(std::iter::repeat(0.0).take(pad));
        let mut y_coords = self.gsp_y_coords.clone();
        y_coords.extend(std::iter::repeat(0.0).take(pad));

        Self::new(gsp_yield, self.time.clone(), ids, x_coords, y_coords)
    }

    pub fn to_dataset(&self, example_index: i32) -> Result<IndexedDataset> {
        let [n_time, n_gsps] = self.shape();
        let mut ds = IndexedDataset::single(example_index);
        ds.insert_f32("gsp_yield", &["time", "id"], &[n_time, n_gsps], self.gsp_yield.clone())?;
        ds.insert_i64(
            "time",
            &["time"],
            &[n_time],
            self.time.iter().map(|t| t.timestamp()).collect(),
        )?;
        ds.insert_f32(
            "gsp_id",
            &["id"],
            &[n_gsps],
            self.gsp_id.iter().map(|v| *v as f32).collect(),
        )?;
        ds.insert_f32(
            "gsp_x_coords",
            &["id"],
            &[n_gsps],
            self.gsp_x_coords.iter().map(|v| *v as f32).collect(),
        )?;
        ds.insert_f32(
            "gsp_y_coords",
            &["id"],
            &[n_gsps],
            self.gsp_y_coords.iter().map(|v| *v as f32).collect(),
        )?;
        Ok(ds)
    }

    pub fn from_dataset(ds: &IndexedDataset) -> Result<Self> {
        let time = ds
            .i64s("time")?
            .iter()
            .map(|s| {
                Utc.timestamp_opt(*s, 0).single().ok_or_else(|| {
                    ExtractorError::validation("gsp", "time", format!("bad epoch {s}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            ds.f32s("gsp_yield")?.to_vec(),
            time,
            ds.f32s("gsp_id")?.iter().map(|v| *v as i64).collect(),
            ds.f32s("gsp_x_coords")?.iter().map(|v| *v as f64).collect(),
            ds.f32s("gsp_y_coords")?.iter().map(|v| *v as f64).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> GspExample {
        let time: Vec<_> = (0..3)
            .map(|i| Utc.timestamp_opt(1_600_000_000 + i * 1800, 0).unwrap())
            .collect();
        GspExample::new(
            (0..6).map(|v| v as f32 * 10.0).collect(),
            time,
            vec![120, 121],
            vec![330_000.0, 340_000.0],
            vec![410_000.0, 420_000.0],
        )
        .unwrap()
    }

    #[test]
    fn test_negative_yield_fails_validation() {
        let good = example();
        let mut gsp_yield = good.gsp_yield.clone();
        gsp_yield[2] = -5.0;
        assert!(GspExample::new(
            gsp_yield,
            good.time,
            good.gsp_id,
            good.gsp_x_coords,
            good.gsp_y_coords,
        )
        .is_err());
    }

    #[test]
    fn test_nan_yield_fails_validation() {
        let good = example();
        let mut gsp_yield = good.gsp_yield.clone();
        gsp_yield[0] = f32::NAN;
        assert!(GspExample::new(
            gsp_yield,
            good.time,
            good.gsp_id,
            good.gsp_x_coords,
            good.gsp_y_coords,
        )
        .is_err());
    }

    #[test]
    fn test_pad_to_fixed_cardinality() {
        let padded = example().pad(4).unwrap();
        assert_eq!(padded.shape(), [3, 4]);
        assert_eq!(padded.gsp_id, vec![120, 121, -1, -1]);
        assert_eq!(padded.gsp_yield[0..2], example().gsp_yield[0..2]);
        assert_eq!(padded.gsp_yield[2..4], [0.0, 0.0]);
        assert_eq!(padded.gsp_yield[4..6], example().gsp_yield[2..4]);
    }

    #[test]
    fn test_dataset_round_trip_preserves_all_arrays() {
        let original = example();
        let ds = original.to_dataset(11).unwrap();
        let restored = GspExample::from_dataset(&ds).unwrap();
        assert_eq!(restored.gsp_yield, original.gsp_yield);
        assert_eq!(restored.gsp_id, original.gsp_id);
        assert_eq!(restored.gsp_x_coords, original.gsp_x_coords);
        assert_eq!(restored.gsp_y_coords, original.gsp_y_coords);
        assert_eq!(restored.time, original.time);
    }
}
