//! Configuration for the example-extraction sources.
//!
//! Config structs are plain values: they carry no open file handles, so an
//! adapter built from them can be cloned into worker processes before
//! `open()` is called.

use serde::{Deserialize, Serialize};

use crate::error::{ExtractorError, Result};

/// Satellite channels present in the stacked EUMETSAT store.
pub const SAT_CHANNEL_NAMES: &[&str] = &[
    "HRV", "IR_016", "IR_039", "IR_087", "IR_097", "IR_108", "IR_120", "IR_134", "VIS006",
    "VIS008", "WV_062", "WV_073",
];

/// NWP forecast parameters loaded by default.  All are instantaneous
/// values at the target time, not accumulations.
pub const NWP_CHANNEL_NAMES: &[&str] = &[
    "t", "dswrf", "prate", "r", "sde", "si10", "vis", "lcc", "mcc", "hcc",
];

/// Configuration shared by the image-like sources (satellite, NWP).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSourceConfig {
    /// Path to the Zarr group backing this source.
    pub zarr_path: String,

    /// Minutes of history included before the anchor.
    pub history_minutes: u32,

    /// Minutes of forecast included after the anchor.
    pub forecast_minutes: u32,

    /// Side length of the square spatial window, in pixels.
    pub image_size_pixels: usize,

    /// Ground distance covered by one pixel, in metres (OSGB).
    pub meters_per_pixel: usize,

    /// Channel names to load, in output order.
    pub channels: Vec<String>,
}

impl ImageSourceConfig {
    fn validate(&self, source: &str, sample_period_minutes: u32) -> Result<()> {
        if self.zarr_path.is_empty() {
            return Err(ExtractorError::config_error(format!(
                "{source}: zarr_path must not be empty"
            )));
        }
        if self.image_size_pixels == 0 {
            return Err(ExtractorError::config_error(format!(
                "{source}: image_size_pixels must be > 0"
            )));
        }
        if self.meters_per_pixel == 0 {
            return Err(ExtractorError::config_error(format!(
                "{source}: meters_per_pixel must be > 0"
            )));
        }
        if self.channels.is_empty() {
            return Err(ExtractorError::config_error(format!(
                "{source}: at least one channel is required"
            )));
        }
        validate_window_minutes(source, self.history_minutes, self.forecast_minutes, sample_period_minutes)
    }
}

/// Configuration shared by the point/region sources (PV, GSP).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSourceConfig {
    /// Path to the Zarr group backing this source.
    pub zarr_path: String,

    /// Minutes of history included before the anchor.
    pub history_minutes: u32,

    /// Minutes of forecast included after the anchor.
    pub forecast_minutes: u32,

    /// Fixed entity cardinality examples are padded to.
    pub n_entities_per_example: usize,

    /// Half-width of the region of interest around the centre, in metres.
    pub roi_half_width_meters: f64,
}

impl PointSourceConfig {
    fn validate(&self, source: &str, sample_period_minutes: u32) -> Result<()> {
        if self.zarr_path.is_empty() {
            return Err(ExtractorError::config_error(format!(
                "{source}: zarr_path must not be empty"
            )));
        }
        if self.n_entities_per_example == 0 {
            return Err(ExtractorError::config_error(format!(
                "{source}: n_entities_per_example must be > 0"
            )));
        }
        if self.roi_half_width_meters <= 0.0 {
            return Err(ExtractorError::config_error(format!(
                "{source}: roi_half_width_meters must be > 0"
            )));
        }
        validate_window_minutes(source, self.history_minutes, self.forecast_minutes, sample_period_minutes)
    }
}

fn validate_window_minutes(
    source: &str,
    history_minutes: u32,
    forecast_minutes: u32,
    sample_period_minutes: u32,
) -> Result<()> {
    for (name, minutes) in [("history_minutes", history_minutes), ("forecast_minutes", forecast_minutes)] {
        if minutes % sample_period_minutes != 0 {
            return Err(ExtractorError::config_error(format!(
                "{source}: {name} ({minutes}) must be a multiple of the \
                 {sample_period_minutes}-minute sample period"
            )));
        }
    }
    Ok(())
}

/// Top-level configuration: one optional section per source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub satellite: Option<ImageSourceConfig>,
    pub nwp: Option<ImageSourceConfig>,
    pub pv: Option<PointSourceConfig>,
    pub gsp: Option<PointSourceConfig>,
}

impl ExtractorConfig {
    /// Apply environment-variable overrides for the store paths.
    pub fn apply_env(&mut self) {
        if let (Some(sat), Ok(path)) = (self.satellite.as_mut(), std::env::var("SATELLITE_ZARR_PATH")) {
            sat.zarr_path = path;
        }
        if let (Some(nwp), Ok(path)) = (self.nwp.as_mut(), std::env::var("NWP_ZARR_PATH")) {
            nwp.zarr_path = path;
        }
        if let (Some(pv), Ok(path)) = (self.pv.as_mut(), std::env::var("PV_ZARR_PATH")) {
            pv.zarr_path = path;
        }
        if let (Some(gsp), Ok(path)) = (self.gsp.as_mut(), std::env::var("GSP_ZARR_PATH")) {
            gsp.zarr_path = path;
        }
    }

    /// Validate every configured source section.
    pub fn validate(&self) -> Result<()> {
        if let Some(sat) = &self.satellite {
            sat.validate("satellite", crate::source::SATELLITE_SAMPLE_PERIOD_MINUTES)?;
        }
        if let Some(nwp) = &self.nwp {
            nwp.validate("nwp", crate::source::NWP_SAMPLE_PERIOD_MINUTES)?;
        }
        if let Some(pv) = &self.pv {
            pv.validate("pv", crate::source::PV_SAMPLE_PERIOD_MINUTES)?;
        }
        if let Some(gsp) = &self.gsp {
            gsp.validate("gsp", crate::source::GSP_SAMPLE_PERIOD_MINUTES)?;
        }
        Ok(())
    }
}

impl ImageSourceConfig {
    /// Default satellite configuration (128 px at 2 km per pixel).
    pub fn satellite_defaults(zarr_path: impl Into<String>) -> Self {
        Self {
            zarr_path: zarr_path.into(),
            history_minutes: 30,
            forecast_minutes: 60,
            image_size_pixels: 128,
            meters_per_pixel: 2_000,
            channels: SAT_CHANNEL_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Default NWP configuration (2 px at 2 km per pixel).
    pub fn nwp_defaults(zarr_path: impl Into<String>) -> Self {
        Self {
            zarr_path: zarr_path.into(),
            history_minutes: 60,
            forecast_minutes: 120,
            image_size_pixels: 2,
            meters_per_pixel: 2_000,
            channels: NWP_CHANNEL_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PointSourceConfig {
    /// Default PV configuration (up to 32 systems within a 64 km square).
    pub fn pv_defaults(zarr_path: impl Into<String>) -> Self {
        Self {
            zarr_path: zarr_path.into(),
            history_minutes: 30,
            forecast_minutes: 60,
            n_entities_per_example: 32,
            roi_half_width_meters: 64_000.0,
        }
    }

    /// Default GSP configuration.
    pub fn gsp_defaults(zarr_path: impl Into<String>) -> Self {
        Self {
            zarr_path: zarr_path.into(),
            history_minutes: 60,
            forecast_minutes: 120,
            n_entities_per_example: 32,
            roi_half_width_meters: 64_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ExtractorConfig {
            satellite: Some(ImageSourceConfig::satellite_defaults("sat.zarr")),
            nwp: Some(ImageSourceConfig::nwp_defaults("nwp.zarr")),
            pv: Some(PointSourceConfig::pv_defaults("pv.zarr")),
            gsp: Some(PointSourceConfig::gsp_defaults("gsp.zarr")),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_must_align_to_sample_period() {
        let mut sat = ImageSourceConfig::satellite_defaults("sat.zarr");
        sat.history_minutes = 17;
        let config = ExtractorConfig {
            satellite: Some(sat),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_path_rejected() {
        let config = ExtractorConfig {
            gsp: Some(PointSourceConfig::gsp_defaults("")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
