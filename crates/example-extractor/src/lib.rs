//! Example extraction for nowcasting models.
//!
//! This crate turns large Zarr stores of weather and solar-power data into
//! small, validated training examples. It provides:
//!
//! - **Source adapters**: satellite imagery, NWP forecasts, PV systems and
//!   grid supply points, each backed by one Zarr group
//! - **Partial reads**: per-example array subsets; whole data arrays are
//!   never loaded
//! - **Validated models**: examples check their own invariants at
//!   construction and serialize to a flat indexed-array form for batching
//!
//! # Architecture
//!
//! ```text
//! ExtractorConfig
//!      │
//!      ▼
//! SatelliteSource / NwpSource / PvSource / GspSource
//!      │
//!      ├─► open()            read + repair coordinate metadata
//!      │
//!      ├─► datetime_index()  usable anchors, intersected across sources
//!      │
//!      └─► get_example(t0, x_center, y_center)
//!               │
//!               ▼
//!          SatelliteExample / NwpExample / PvExample / GspExample
//!               │
//!               ▼
//!          IndexedDataset ──► concat_examples ──► batch
//! ```
//!
//! # Example
//!
//! ```ignore
//! use example_extractor::config::ImageSourceConfig;
//! use example_extractor::source::{DataSource, SatelliteSource};
//!
//! let mut source = SatelliteSource::new(ImageSourceConfig::satellite_defaults(
//!     "/data/satellite.zarr",
//! ));
//! source.open()?;
//!
//! let t0 = source.datetime_index()?[100];
//! let example = source.get_example(t0, 250_000.0, 150_000.0)?;
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod store;
pub mod testdata;
pub mod window;

// Re-export commonly used types at crate root
pub use batch::{concat_examples, ArrayData, IndexedDataset, NamedArray};
pub use config::{ExtractorConfig, ImageSourceConfig, PointSourceConfig};
pub use error::{ExtractorError, Result};
pub use model::{GspExample, NwpExample, PvExample, SatelliteExample};
pub use source::{DataSource, Example, GspSource, NwpSource, PvSource, SatelliteSource};
