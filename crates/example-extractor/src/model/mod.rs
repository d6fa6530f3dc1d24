//! Validated example output models, one per source.
//!
//! Models validate on construction and fail with a precise message naming
//! the field and the violated invariant.  Nothing is silently clamped: the
//! only tolerated fixup is the opt-in, logged sentinel check on satellite
//! data.  Each model converts losslessly (at f32 precision) to and from
//! the [`crate::batch::IndexedDataset`] form.

mod gsp;
mod nwp;
mod pv;
mod satellite;

pub use gsp::GspExample;
pub use nwp::NwpExample;
pub use pv::PvExample;
pub use satellite::SatelliteExample;

use crate::error::{ExtractorError, Result};

/// Fail if any value is NaN or infinite.
pub(crate) fn check_finite(
    class_name: &'static str,
    field: &'static str,
    data: &[f32],
) -> Result<()> {
    if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
        return Err(ExtractorError::validation(
            class_name,
            field,
            format!("contains NaN or Inf at flat index {pos}"),
        ));
    }
    Ok(())
}

/// Fail if any value is negative.
pub(crate) fn check_non_negative(
    class_name: &'static str,
    field: &'static str,
    data: &[f32],
) -> Result<()> {
    if let Some(pos) = data.iter().position(|v| *v < 0.0) {
        return Err(ExtractorError::validation(
            class_name,
            field,
            format!("contains a negative value ({}) at flat index {pos}", data[pos]),
        ));
    }
    Ok(())
}

/// Fail unless an axis has the expected length.
pub(crate) fn check_axis_len(
    class_name: &'static str,
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<()> {
    if expected != actual {
        return Err(ExtractorError::validation(
            class_name,
            field,
            format!("axis length {actual} does not match expected {expected}"),
        ));
    }
    Ok(())
}

/// Opt-in sentinel check: logs a warning when `sentinel` appears in the
/// data.  Returns true when the data is clean.
pub(crate) fn warn_on_sentinel(
    class_name: &'static str,
    field: &'static str,
    data: &[f32],
    sentinel: f32,
) -> bool {
    let n_hits = data.iter().filter(|v| **v == sentinel).count();
    if n_hits > 0 {
        tracing::warn!(
            class_name,
            field,
            sentinel,
            n_hits,
            "sentinel value present in example data"
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_finite() {
        assert!(check_finite("satellite", "data", &[0.0, 1.5]).is_ok());
        assert!(check_finite("satellite", "data", &[0.0, f32::NAN]).is_err());
        assert!(check_finite("satellite", "data", &[f32::INFINITY]).is_err());
    }

    #[test]
    fn test_check_non_negative() {
        assert!(check_non_negative("pv", "power_mw", &[0.0, 2.0]).is_ok());
        let err = check_non_negative("pv", "power_mw", &[1.0, -0.5]).unwrap_err();
        assert!(err.to_string().contains("power_mw"));
    }

    #[test]
    fn test_warn_on_sentinel() {
        assert!(warn_on_sentinel("satellite", "data", &[0.0, 1.0], -1.0));
        assert!(!warn_on_sentinel("satellite", "data", &[0.0, -1.0], -1.0));
    }
}
