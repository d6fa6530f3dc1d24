//! Synthetic Zarr stores for tests.
//!
//! Each writer produces a small store with the production layout and a
//! deterministic value pattern, so tests can verify windowing and channel
//! selection against exact expected values rather than statistics.
//!
//! Patterns encode every index into the value with non-overlapping digit
//! ranges, and stay far below 2^24 so they are exact in f32.

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Side length of the satellite test grid, in pixels (2 km spacing).
pub const SAT_GRID_SIZE: usize = 16;
/// Side length of the NWP test grid, in pixels (2 km spacing).
pub const NWP_GRID_SIZE: usize = 8;

/// Satellite test pattern: value at `[time, y, x, channel]` store indices.
pub fn satellite_value(t: usize, y: usize, x: usize, c: usize) -> f32 {
    (t * 100_000 + y * 1_000 + x * 10 + c) as f32
}

/// NWP test pattern: value at `[channel, init, step, y, x]` store indices.
pub fn nwp_value(c: usize, init: usize, step: usize, y: usize, x: usize) -> f32 {
    (c * 100_000 + init * 10_000 + step * 1_000 + y * 10 + x) as f32
}

/// PV test pattern: power at `[time, system]` store indices.
pub fn pv_value(t: usize, system: usize) -> f32 {
    (t * 10 + system) as f32 * 0.25
}

/// GSP test pattern: yield at `[time, gsp]` store indices.
pub fn gsp_value(t: usize, gsp: usize) -> f32 {
    (t * 3 + gsp) as f32
}

fn write_f32(
    store: &Arc<FilesystemStore>,
    name: &str,
    shape: Vec<u64>,
    data: &[f32],
    channels: Option<&[&str]>,
) -> TestResult {
    let mut builder = ArrayBuilder::new(
        shape.clone(),
        DataType::Float32,
        shape.clone().try_into()?,
        FillValue::from(f32::NAN),
    );
    if let Some(channels) = channels {
        builder.attributes({
            let mut attrs = serde_json::Map::new();
            attrs.insert("channels".to_string(), serde_json::json!(channels));
            attrs
        });
    }
    let array = builder.build(store.clone(), &format!("/{name}"))?;
    array.store_metadata()?;
    let subset = ArraySubset::new_with_shape(shape);
    array.store_array_subset_elements(&subset, data)?;
    Ok(())
}

fn write_i64(store: &Arc<FilesystemStore>, name: &str, data: &[i64]) -> TestResult {
    let shape = vec![data.len() as u64];
    let array = ArrayBuilder::new(
        shape.clone(),
        DataType::Int64,
        shape.clone().try_into()?,
        FillValue::from(0i64),
    )
    .build(store.clone(), &format!("/{name}"))?;
    array.store_metadata()?;
    let subset = ArraySubset::new_with_shape(shape);
    array.store_array_subset_elements(&subset, data)?;
    Ok(())
}

fn write_f64(store: &Arc<FilesystemStore>, name: &str, data: &[f64]) -> TestResult {
    let shape = vec![data.len() as u64];
    let array = ArrayBuilder::new(
        shape.clone(),
        DataType::Float64,
        shape.clone().try_into()?,
        FillValue::from(f64::NAN),
    )
    .build(store.clone(), &format!("/{name}"))?;
    array.store_metadata()?;
    let subset = ArraySubset::new_with_shape(shape);
    array.store_array_subset_elements(&subset, data)?;
    Ok(())
}

fn epochs(start: chrono::DateTime<Utc>, n: usize, step_minutes: i64) -> Vec<i64> {
    (0..n)
        .map(|i| (start + chrono::Duration::minutes(i as i64 * step_minutes)).timestamp())
        .collect()
}

/// Satellite store: `data [25, 16, 16, 2]`, 5-minute cadence from
/// 2020-01-01 12:00 UTC, channels `[HRV, IR_016]`.  The y axis is written
/// ascending so adapters must flip it.
pub fn write_satellite_store(path: &Path) -> TestResult {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);

    let n_time = 25;
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
    write_i64(&store, "time", &epochs(start, n_time, 5))?;

    let coords: Vec<f64> = (0..SAT_GRID_SIZE).map(|i| i as f64 * 2_000.0).collect();
    write_f64(&store, "y", &coords)?;
    write_f64(&store, "x", &coords)?;

    let mut data = Vec::with_capacity(n_time * SAT_GRID_SIZE * SAT_GRID_SIZE * 2);
    for t in 0..n_time {
        for y in 0..SAT_GRID_SIZE {
            for x in 0..SAT_GRID_SIZE {
                for c in 0..2 {
                    data.push(satellite_value(t, y, x, c));
                }
            }
        }
    }
    write_f32(
        &store,
        "data",
        vec![n_time as u64, SAT_GRID_SIZE as u64, SAT_GRID_SIZE as u64, 2],
        &data,
        Some(&["HRV", "IR_016"]),
    )
}

/// NWP store: `data [2, 2, 9, 8, 8]`, runs at 2020-01-01 00:00 and 03:00
/// UTC with steps 0..=8 hours, channels `[t, dswrf]`.  The y axis is
/// written descending (already canonical).
pub fn write_nwp_store(path: &Path) -> TestResult {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);

    let inits = [
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 1, 1, 3, 0, 0).unwrap(),
    ];
    write_i64(
        &store,
        "init_time",
        &inits.iter().map(|t| t.timestamp()).collect::<Vec<_>>(),
    )?;
    let steps: Vec<i64> = (0..9).collect();
    write_i64(&store, "step", &steps)?;

    let y: Vec<f64> = (0..NWP_GRID_SIZE).rev().map(|i| i as f64 * 2_000.0).collect();
    let x: Vec<f64> = (0..NWP_GRID_SIZE).map(|i| i as f64 * 2_000.0).collect();
    write_f64(&store, "y", &y)?;
    write_f64(&store, "x", &x)?;

    let mut data =
        Vec::with_capacity(2 * inits.len() * steps.len() * NWP_GRID_SIZE * NWP_GRID_SIZE);
    for c in 0..2 {
        for init in 0..inits.len() {
            for step in 0..steps.len() {
                for y in 0..NWP_GRID_SIZE {
                    for x in 0..NWP_GRID_SIZE {
                        data.push(nwp_value(c, init, step, y, x));
                    }
                }
            }
        }
    }
    write_f32(
        &store,
        "data",
        vec![
            2,
            inits.len() as u64,
            steps.len() as u64,
            NWP_GRID_SIZE as u64,
            NWP_GRID_SIZE as u64,
        ],
        &data,
        Some(&["t", "dswrf"]),
    )
}

/// PV store: `power_mw [25, 4]`, 5-minute cadence from 2020-01-01 12:00
/// UTC.  Systems 10, 20 and 40 sit near the origin, system 30 is 200 km
/// away, and system 40 has no readings at all (all NaN).
pub fn write_pv_store(path: &Path) -> TestResult {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);

    let n_time = 25;
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
    write_i64(&store, "time", &epochs(start, n_time, 5))?;
    write_i64(&store, "id", &[10, 20, 30, 40])?;
    write_f32(&store, "capacity_mwp", vec![4], &[1.0, 2.0, 3.0, 4.0], None)?;
    write_f64(&store, "x", &[0.0, 2_000.0, 200_000.0, 4_000.0])?;
    write_f64(&store, "y", &[0.0, 1_000.0, 200_000.0, 4_000.0])?;

    let mut power = Vec::with_capacity(n_time * 4);
    for t in 0..n_time {
        for system in 0..4 {
            power.push(if system == 3 {
                f32::NAN
            } else {
                pv_value(t, system)
            });
        }
    }
    write_f32(&store, "power_mw", vec![n_time as u64, 4], &power, None)
}

/// GSP store: `gsp_yield [13, 3]`, half-hourly from 2020-01-01 10:00 UTC.
/// Centroids at the origin, 10 km east, and 200 km east.
pub fn write_gsp_store(path: &Path) -> TestResult {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);

    let n_time = 13;
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 10, 0, 0).unwrap();
    write_i64(&store, "time", &epochs(start, n_time, 30))?;
    write_i64(&store, "gsp_id", &[1, 2, 3])?;
    write_f64(&store, "x", &[0.0, 10_000.0, 200_000.0])?;
    write_f64(&store, "y", &[0.0, 0.0, 0.0])?;

    let mut yields = Vec::with_capacity(n_time * 3);
    for t in 0..n_time {
        for gsp in 0..3 {
            yields.push(gsp_value(t, gsp));
        }
    }
    write_f32(&store, "gsp_yield", vec![n_time as u64, 3], &yields, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ZarrGroup;

    #[test]
    fn test_satellite_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        write_satellite_store(dir.path()).unwrap();

        let group = ZarrGroup::open(dir.path().to_str().unwrap()).unwrap();
        let time = group.read_datetimes("time").unwrap();
        assert_eq!(time.len(), 25);
        assert_eq!(
            time[0],
            Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap()
        );

        let data = group.array("data").unwrap();
        assert_eq!(data.shape(), &[25, 16, 16, 2]);
        let channels = crate::store::channels_attr(&data).unwrap();
        assert_eq!(channels, vec!["HRV", "IR_016"]);
    }

    #[test]
    fn test_pv_store_has_nan_system() {
        let dir = tempfile::tempdir().unwrap();
        write_pv_store(dir.path()).unwrap();

        let group = ZarrGroup::open(dir.path().to_str().unwrap()).unwrap();
        let power = group.array("power_mw").unwrap();
        let row = crate::store::retrieve_f32_subset(&power, vec![0, 0], vec![1, 4]).unwrap();
        assert_eq!(row[0], pv_value(0, 0));
        assert!(row[3].is_nan());
    }
}
