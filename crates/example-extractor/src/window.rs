//! Spatial windowing: square pixel windows around a centre coordinate.
//!
//! Windows are derived, never stored: given the coordinate array of one
//! axis and a centre in the same projection, compute the index range of a
//! fixed-size window, failing loudly when the centre sits too close to the
//! edge of the stored grid.

use std::ops::Range;

use crate::error::{ExtractorError, Result};

/// Locate the pixel containing `center` along a monotonic coordinate axis.
///
/// Equivalent to a searchsorted-then-step-back: the returned index is the
/// last pixel whose coordinate does not pass `center`, so the centre falls
/// within that pixel.  Works for ascending and descending axes.
pub fn locate_index(coords: &[f64], center: f64) -> Result<usize> {
    if coords.len() < 2 {
        return Err(ExtractorError::invalid_metadata(
            "coordinate axis must have at least 2 entries",
        ));
    }

    let ascending = coords[0] < coords[1];
    let n_passed = if ascending {
        coords.partition_point(|&v| v < center)
    } else {
        coords.partition_point(|&v| v > center)
    };

    if n_passed == 0 {
        // Centre lies before the first pixel.
        return Ok(0);
    }
    Ok(n_passed - 1)
}

/// Index range of a square window of `size_pixels` centred on `center`.
///
/// The centre pixel is located with [`locate_index`], then half the window
/// is subtracted.  Fails with a descriptive error naming the axis when the
/// window would fall off either edge.
pub fn window_indices(
    coords: &[f64],
    center: f64,
    size_pixels: usize,
    axis: char,
) -> Result<Range<usize>> {
    let index = locate_index(coords, center)?;
    let half = size_pixels / 2;

    if index < half {
        return Err(ExtractorError::WindowOutOfBounds {
            axis,
            center,
            required_pixels: half,
            index,
            axis_len: coords.len(),
        });
    }
    let min = index - half;
    if min + size_pixels > coords.len() {
        return Err(ExtractorError::WindowOutOfBounds {
            axis,
            center,
            required_pixels: size_pixels - half,
            index,
            axis_len: coords.len(),
        });
    }

    Ok(min..min + size_pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending_axis() -> Vec<f64> {
        (0..64).map(|i| i as f64 * 2_000.0).collect()
    }

    fn descending_axis() -> Vec<f64> {
        (0..64).rev().map(|i| i as f64 * 2_000.0).collect()
    }

    #[test]
    fn test_locate_index_ascending() {
        let coords = ascending_axis();
        assert_eq!(locate_index(&coords, 0.0).unwrap(), 0);
        // 63_000 falls within the pixel starting at 62_000.
        assert_eq!(locate_index(&coords, 63_000.0).unwrap(), 31);
        assert_eq!(locate_index(&coords, 64_000.0).unwrap(), 31);
    }

    #[test]
    fn test_locate_index_descending() {
        let coords = descending_axis();
        // 63_000 sits between coords[31] = 64_000 and coords[32] = 62_000.
        assert_eq!(locate_index(&coords, 63_000.0).unwrap(), 31);
        assert_eq!(locate_index(&coords, 126_000.0).unwrap(), 0);
    }

    #[test]
    fn test_window_indices_centered() {
        let coords = ascending_axis();
        let range = window_indices(&coords, 64_000.0, 16, 'x').unwrap();
        assert_eq!(range, 23..39);
        assert_eq!(range.len(), 16);
    }

    #[test]
    fn test_window_too_close_to_low_edge() {
        let coords = ascending_axis();
        let err = window_indices(&coords, 4_000.0, 16, 'x').unwrap_err();
        match err {
            ExtractorError::WindowOutOfBounds { axis, required_pixels, .. } => {
                assert_eq!(axis, 'x');
                assert_eq!(required_pixels, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_window_too_close_to_high_edge() {
        let coords = ascending_axis();
        assert!(window_indices(&coords, 124_000.0, 16, 'y').is_err());
    }
}
