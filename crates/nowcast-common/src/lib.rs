//! Common types and utilities shared across the nowcasting example-extraction crates.
//!
//! Everything in here is pure computation: no I/O, no store handles.  The
//! modules are:
//!
//! - [`time`]: datetime-index alignment (monotonicity, intersection, valid
//!   start/anchor selection, cyclical datetime features).
//! - [`periods`]: interval-overlap computation between labelled time ranges.
//! - [`osgb`]: British National Grid easting/northing to latitude/longitude.
//! - [`sun`]: clear-sky irradiance and daylight-only datetime filtering.

pub mod osgb;
pub mod periods;
pub mod sun;
pub mod time;

pub use periods::{intersection_of_periods, Period};
pub use sun::select_daylight_datetimes;
pub use time::{
    datetime_features_in_example, get_start_datetimes, get_t0_datetimes,
    intersection_of_datetime_indexes, is_monotonically_increasing, DatetimeFeatures,
};
