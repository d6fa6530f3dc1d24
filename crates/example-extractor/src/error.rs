//! Error types for example extraction.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while extracting training examples.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Failed to open the backing Zarr store.
    #[error("failed to open store: {0}")]
    OpenFailed(String),

    /// Failed to read data from the backing store.
    #[error("failed to read store data: {0}")]
    ReadFailed(String),

    /// The adapter was used before `open()` was called in this process.
    #[error("data source '{source_name}' is not open; call open() after worker placement")]
    NotOpened { source_name: &'static str },

    /// The requested spatial window does not fit inside the stored grid.
    #[error(
        "{axis} centre {center} must be at least {required_pixels} pixels from the \
         edge of the area (located index {index}, axis length {axis_len})"
    )]
    WindowOutOfBounds {
        axis: char,
        center: f64,
        required_pixels: usize,
        index: usize,
        axis_len: usize,
    },

    /// The extracted example does not have the declared shape.
    #[error(
        "example is the wrong shape for '{source_name}': t0={t0}, x_center={x_center}, \
         y_center={y_center}, expected {expected:?}, actual {actual:?}"
    )]
    ShapeMismatch {
        source_name: &'static str,
        t0: DateTime<Utc>,
        x_center: f64,
        y_center: f64,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A constructed example violated a declared invariant.
    #[error("validation failed for {class_name}.{field}: {message}")]
    Validation {
        class_name: &'static str,
        field: &'static str,
        message: String,
    },

    /// Invalid or missing metadata in the backing store.
    #[error("invalid store metadata: {0}")]
    InvalidMetadata(String),

    /// Zarr format error.
    #[error("Zarr error: {0}")]
    ZarrError(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl ExtractorError {
    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create a Validation error.
    pub fn validation(
        class_name: &'static str,
        field: &'static str,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            class_name,
            field,
            message: msg.into(),
        }
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create a ZarrError.
    pub fn zarr_error(msg: impl Into<String>) -> Self {
        Self::ZarrError(msg.into())
    }

    /// Create a ConfigError.
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl From<std::io::Error> for ExtractorError {
    fn from(err: std::io::Error) -> Self {
        Self::OpenFailed(err.to_string())
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMetadata(err.to_string())
    }
}

/// Result type for extractor operations.
pub type Result<T> = std::result::Result<T, ExtractorError>;
