//! End-to-end extraction against synthetic Zarr stores.
//!
//! Builds one store per source, aligns their datetime indexes, and pulls
//! examples through the full adapter -> model -> batch pipeline.

use chrono::{Duration, TimeZone, Utc};

use example_extractor::config::{ImageSourceConfig, PointSourceConfig};
use example_extractor::source::{DataSource, Example};
use example_extractor::{concat_examples, testdata, GspSource, NwpSource, PvSource, SatelliteSource};
use nowcast_common::time::{get_t0_datetimes, intersection_of_datetime_indexes};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn satellite_source(dir: &std::path::Path) -> SatelliteSource {
    init_tracing();
    testdata::write_satellite_store(dir).unwrap();
    let mut config = ImageSourceConfig::satellite_defaults(dir.to_str().unwrap());
    config.history_minutes = 10;
    config.forecast_minutes = 10;
    config.image_size_pixels = 4;
    config.channels = vec!["HRV".to_string(), "IR_016".to_string()];
    let mut source = SatelliteSource::new(config);
    source.open().unwrap();
    source
}

fn pv_source(dir: &std::path::Path) -> PvSource {
    testdata::write_pv_store(dir).unwrap();
    let mut config = PointSourceConfig::pv_defaults(dir.to_str().unwrap());
    config.n_entities_per_example = 4;
    let mut source = PvSource::new(config);
    source.open().unwrap();
    source
}

fn gsp_source(dir: &std::path::Path) -> GspSource {
    testdata::write_gsp_store(dir).unwrap();
    let mut config = PointSourceConfig::gsp_defaults(dir.to_str().unwrap());
    config.n_entities_per_example = 3;
    let mut source = GspSource::new(config);
    source.open().unwrap();
    source
}

#[test]
fn test_aligned_t0_yields_examples_from_every_source() {
    let sat_dir = tempfile::tempdir().unwrap();
    let pv_dir = tempfile::tempdir().unwrap();
    let gsp_dir = tempfile::tempdir().unwrap();

    let satellite = satellite_source(sat_dir.path());
    let pv = pv_source(pv_dir.path());
    let gsp = gsp_source(gsp_dir.path());

    // Satellite and PV tick every 5 minutes, GSP every 30; the shared
    // timestamps are the half-hour marks of the overlapping span.
    let indexes = vec![
        satellite.datetime_index().unwrap(),
        pv.datetime_index().unwrap(),
        gsp.datetime_index().unwrap(),
    ];
    let common = intersection_of_datetime_indexes(&indexes);
    let expected: Vec<_> = (0..5)
        .map(|i| {
            Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap()
                + Duration::minutes(30 * i)
        })
        .collect();
    assert_eq!(common, expected);

    let t0s = get_t0_datetimes(&common, 3, Duration::minutes(30), Duration::minutes(30));
    assert!(t0s.contains(&Utc.with_ymd_and_hms(2020, 1, 1, 12, 30, 0).unwrap()));
    let t0 = t0s[0];

    let Example::Satellite(sat_example) = satellite.get_example(t0, 8_000.0, 8_000.0).unwrap()
    else {
        panic!("wrong variant");
    };
    assert_eq!(sat_example.shape(), [5, 4, 4, 2]);

    let Example::Pv(pv_example) = pv.get_example(t0, 1_000.0, 1_000.0).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(pv_example.shape(), [19, 4]);
    assert_eq!(pv_example.time[6], t0);

    let Example::Gsp(gsp_example) = gsp.get_example(t0, 1_000.0, 0.0).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(gsp_example.shape(), [7, 3]);
    assert_eq!(gsp_example.gsp_id[0], 1);
}

#[test]
fn test_nwp_example_from_freshest_run() {
    let dir = tempfile::tempdir().unwrap();
    testdata::write_nwp_store(dir.path()).unwrap();
    let mut config = ImageSourceConfig::nwp_defaults(dir.path().to_str().unwrap());
    config.channels = vec!["t".to_string(), "dswrf".to_string()];
    let mut source = NwpSource::new(config);
    source.open().unwrap();

    let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 4, 0, 0).unwrap();
    let Example::Nwp(example) = source.get_example(t0, 8_000.0, 8_000.0).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(example.shape(), [2, 4, 2, 2]);
    assert_eq!(
        example.init_time,
        Utc.with_ymd_and_hms(2020, 1, 1, 3, 0, 0).unwrap()
    );
}

#[test]
fn test_examples_concat_into_a_batch() {
    let dir = tempfile::tempdir().unwrap();
    let satellite = satellite_source(dir.path());

    let t0s = [
        Utc.with_ymd_and_hms(2020, 1, 1, 12, 30, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 1, 1, 12, 35, 0).unwrap(),
    ];
    let datasets: Vec<_> = t0s
        .iter()
        .enumerate()
        .map(|(i, &t0)| {
            satellite
                .get_example(t0, 8_000.0, 8_000.0)
                .unwrap()
                .to_dataset(i as i32)
                .unwrap()
        })
        .collect();

    let batch = concat_examples(&datasets).unwrap();
    assert_eq!(batch.example, vec![0, 1]);

    let data = batch.array("data").unwrap();
    assert_eq!(data.dims, vec!["example", "time", "y", "x", "channel"]);
    assert_eq!(data.shape, vec![2, 5, 4, 4, 2]);

    // The two windows overlap by four steps; the second example starts one
    // step later, so its first frame equals the first example's second.
    let values = batch.f32s("data").unwrap();
    let per_example = 5 * 4 * 4 * 2;
    let per_step = 4 * 4 * 2;
    assert_eq!(
        values[per_example..per_example + per_step],
        values[per_step..2 * per_step]
    );
}
