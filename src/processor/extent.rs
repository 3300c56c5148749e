//! Extent calculation: grid resolution and the buffered crop box.

use crate::error::{ExtractError, Result};
use crate::models::BoundingBox;
use tracing::debug;

/// Grid resolution from the spacing of the first two latitude samples
pub fn grid_resolution(latitudes: &[f64]) -> Result<f64> {
    if latitudes.len() < 2 {
        return Err(ExtractError::UndecidableResolution {
            reason: format!(
                "need at least two latitude samples, found {}",
                latitudes.len()
            ),
        });
    }

    let resolution = (latitudes[1] - latitudes[0]).abs();
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(ExtractError::UndecidableResolution {
            reason: format!(
                "latitude spacing {} between {} and {} is not positive",
                resolution, latitudes[0], latitudes[1]
            ),
        });
    }

    Ok(resolution)
}

/// Boundary box grown by `buffer_cells × resolution` on every side.
///
/// Cells whose centre lies just outside the raw box can still overlap the
/// boundary, so the crop must reach past it.
pub fn buffered_extent(bounds: &BoundingBox, resolution: f64, buffer_cells: f64) -> BoundingBox {
    let extent = bounds.buffered(resolution * buffer_cells);
    debug!("Buffered extent: {} (resolution {})", extent, resolution);
    extent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_from_ascending_axis() {
        assert_eq!(grid_resolution(&[10.0, 10.25, 10.5]).unwrap(), 0.25);
    }

    #[test]
    fn test_resolution_from_descending_axis() {
        assert_eq!(grid_resolution(&[40.0, 39.5, 39.0]).unwrap(), 0.5);
    }

    #[test]
    fn test_single_latitude_is_undecidable() {
        let err = grid_resolution(&[10.0]).unwrap_err();
        assert!(matches!(err, ExtractError::UndecidableResolution { .. }));
    }

    #[test]
    fn test_repeated_latitude_is_undecidable() {
        assert!(grid_resolution(&[10.0, 10.0, 11.0]).is_err());
        assert!(grid_resolution(&[f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_buffer_is_two_cells_by_default() {
        let bounds = BoundingBox::new(77.0, 12.0, 78.0, 13.0);
        let extent = buffered_extent(&bounds, 0.25, 2.0);
        assert_eq!(extent, BoundingBox::new(76.5, 11.5, 78.5, 13.5));
    }
}
