//! PV example model.

use chrono::{DateTime, TimeZone, Utc};

use super::{check_axis_len, check_finite, check_non_negative};
use crate::batch::IndexedDataset;
use crate::error::{ExtractorError, Result};

/// Entity id marking a padded (absent) PV system.
pub const PAD_SYSTEM_ID: i64 = -1;

/// One PV example: `[time, system]` power readings for the systems in the
/// region of interest, centre system first.
#[derive(Debug, Clone, PartialEq)]
pub struct PvExample {
    /// Power in MW, row-major over `[time, system]`.
    pub power_mw: Vec<f32>,
    pub time: Vec<DateTime<Utc>>,
    /// Stable row number of each system in the source metadata.
    pub pv_system_row_number: Vec<i64>,
    /// Nameplate capacity per system, MWp; the normalizer for power.
    pub capacity_mwp: Vec<f32>,
    /// OSGB easting per system.
    pub x_coords: Vec<f64>,
    /// OSGB northing per system.
    pub y_coords: Vec<f64>,
}

impl PvExample {
    /// Construct and validate: finite, non-negative power; coordinate,
    /// capacity and id arrays matching the system axis.
    pub fn new(
        power_mw: Vec<f32>,
        time: Vec<DateTime<Utc>>,
        pv_system_row_number: Vec<i64>,
        capacity_mwp: Vec<f32>,
        x_coords: Vec<f64>,
        y_coords: Vec<f64>,
    ) -> Result<Self> {
        let n_systems = pv_system_row_number.len();
        if time.is_empty() || n_systems == 0 {
            return Err(ExtractorError::validation(
                "pv",
                "power_mw",
                "time and system axes must be non-empty",
            ));
        }
        check_axis_len("pv", "power_mw", time.len() * n_systems, power_mw.len())?;
        check_axis_len("pv", "capacity_mwp", n_systems, capacity_mwp.len())?;
        check_axis_len("pv", "x_coords", n_systems, x_coords.len())?;
        check_axis_len("pv", "y_coords", n_systems, y_coords.len())?;
        check_finite("pv", "power_mw", &power_mw)?;
        check_non_negative("pv", "power_mw", &power_mw)?;
        check_finite("pv", "capacity_mwp", &capacity_mwp)?;
        check_non_negative("pv", "capacity_mwp", &capacity_mwp)?;
        Ok(Self {
            power_mw,
            time,
            pv_system_row_number,
            capacity_mwp,
            x_coords,
            y_coords,
        })
    }

    /// `[time, system]` axis lengths.
    pub fn shape(&self) -> [usize; 2] {
        [self.time.len(), self.pv_system_row_number.len()]
    }

    /// Pad the system axis up to `n_systems` with zero power, zero
    /// capacity/coordinates and [`PAD_SYSTEM_ID`] ids.
    ///
    /// Only valid for single (non-batched) examples, which is the only
    /// form this type represents.
    pub fn pad(&self, n_systems: usize) -> Result<Self> {
        let [n_time, n_current] = self.shape();
        if n_current > n_systems {
            return Err(ExtractorError::validation(
                "pv",
                "pv_system_row_number",
                format!("cannot pad {n_current} systems down to {n_systems}"),
            ));
        }

        let mut power_mw = Vec::with_capacity(n_time * n_systems);
        for t in 0..n_time {
            power_mw.extend_from_slice(&self.power_mw[t * n_current..(t + 1) * n_current]);
            power_mw.extend(std::iter::repeat(0.0).take(n_systems - n_current));
        }

        let pad = n_systems - n_current;
        let mut ids = self.pv_system_row_number.clone();
        ids.extend(std::iter::repeat(PAD_SYSTEM_ID).take(pad));
        let mut capacity = self.capacity_mwp.clone();
        capacity.extend(std::iter::repeat(0.0).take(pad));
        let mut x_coords = self.x_coords.clone();
        x_coords.extend(std::iter::repeat(0.0).take(pad));
        let mut y_coords = self.y_coords.clone();
        y_coords.extend(std::iter::repeat(0.0).take(pad));

        Self::new(power_mw, self.time.clone(), ids, capacity, x_coords, y_coords)
    }

    pub fn to_dataset(&self, example_index: i32) -> Result<IndexedDataset> {
        let [n_time, n_systems] = self.shape();
        let mut ds = IndexedDataset::single(example_index);
        ds.insert_f32("power_mw", &["time", "id"], &[n_time, n_systems], self.power_mw.clone())?;
        ds.insert_i64(
            "time",
            &["time"],
            &[n_time],
            self.time.iter().map(|t| t.timestamp()).collect(),
        )?;
        ds.insert_f32(
            "pv_system_row_number",
            &["id"],
            &[n_systems],
            self.pv_system_row_number.iter().map(|v| *v as f32).collect(),
        )?;
        ds.insert_f32("capacity_mwp", &["id"], &[n_systems], self.capacity_mwp.clone())?;
        ds.insert_f32(
            "x_coords",
            &["id"],
            &[n_systems],
            self.x_coords.iter().map(|v| *v as f32).collect(),
        )?;
        ds.insert_f32(
            "y_coords",
            &["id"],
            &[n_systems],
            self.y_coords.iter().map(|v| *v as f32).collect(),
        )?;
        Ok(ds)
    }

    pub fn from_dataset(ds: &IndexedDataset) -> Result<Self> {
        let time = ds
            .i64s("time")?
            .iter()
            .map(|s| {
                Utc.timestamp_opt(*s, 0).single().ok_or_else(|| {
                    ExtractorError::validation("pv", "time", format!("bad epoch {s}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            ds.f32s("power_mw")?.to_vec(),
            time,
            ds.f32s("pv_system_row_number")?.iter().map(|v| *v as i64).collect(),
            ds.f32s("capacity_mwp")?.to_vec(),
            ds.f32s("x_coords")?.iter().map(|v| *v as f64).collect(),
            ds.f32s("y_coords")?.iter().map(|v| *v as f64).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> PvExample {
        let time: Vec<_> = (0..4)
            .map(|i| Utc.timestamp_opt(1_600_000_000 + i * 300, 0).unwrap())
            .collect();
        PvExample::new(
            (0..8).map(|v| v as f32 * 0.1).collect(),
            time,
            vec![17, 42],
            vec![4.0, 2.5],
            vec![100_000.0, 102_000.0],
            vec![200_000.0, 198_000.0],
        )
        .unwrap()
    }

    #[test]
    fn test_negative_power_fails_validation() {
        let good = example();
        let mut power = good.power_mw.clone();
        power[3] = -0.1;
        let err = PvExample::new(
            power,
            good.time,
            good.pv_system_row_number,
            good.capacity_mwp,
            good.x_coords,
            good.y_coords,
        )
        .unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_nan_power_fails_validation() {
        let good = example();
        let mut power = good.power_mw.clone();
        power[0] = f32::NAN;
        assert!(PvExample::new(
            power,
            good.time,
            good.pv_system_row_number,
            good.capacity_mwp,
            good.x_coords,
            good.y_coords,
        )
        .is_err());
    }

    #[test]
    fn test_pad_to_fixed_cardinality() {
        let padded = example().pad(5).unwrap();
        assert_eq!(padded.shape(), [4, 5]);
        assert_eq!(padded.pv_system_row_number, vec![17, 42, -1, -1, -1]);
        // Original power survives in the first columns of each row.
        assert_eq!(padded.power_mw[0..2], example().power_mw[0..2]);
        assert_eq!(padded.power_mw[2..5], [0.0, 0.0, 0.0]);
        assert_eq!(padded.power_mw[5..7], example().power_mw[2..4]);
    }

    #[test]
    fn test_pad_below_current_fails() {
        assert!(example().pad(1).is_err());
    }

    #[test]
    fn test_dataset_round_trip() {
        let original = example();
        let ds = original.to_dataset(3).unwrap();
        let restored = PvExample::from_dataset(&ds).unwrap();
        assert_eq!(restored, original);
    }
}
