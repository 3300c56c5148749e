//! CF packing: fill-value masking and `scale_factor` / `add_offset`.

use ndarray::Array3;

/// Packing attributes of one variable
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CfPacking {
    /// `_FillValue`, or `missing_value` when no fill value is declared
    pub fill: Option<f64>,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
}

impl CfPacking {
    pub fn new(
        fill_value: Option<f64>,
        missing_value: Option<f64>,
        scale: Option<f64>,
        offset: Option<f64>,
    ) -> Self {
        Self {
            fill: fill_value.or(missing_value),
            scale,
            offset,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.fill.is_none() && self.scale.is_none() && self.offset.is_none()
    }

    /// Unpack one raw value; fill cells become NaN
    pub fn unpack_value(&self, raw: f64) -> f64 {
        if self.fill == Some(raw) {
            return f64::NAN;
        }
        raw * self.scale.unwrap_or(1.0) + self.offset.unwrap_or(0.0)
    }

    /// Unpack raw values in place. Fill is compared before scaling.
    pub fn unpack(&self, values: &mut Array3<f64>) {
        if self.is_identity() {
            return;
        }
        values.mapv_inplace(|raw| self.unpack_value(raw));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_leaves_values_untouched() {
        let mut values = Array3::from_elem((2, 1, 1), 0.123456789012345);
        CfPacking::default().unpack(&mut values);
        assert_eq!(values[[1, 0, 0]], 0.123456789012345);
    }

    #[test]
    fn test_packed_short_with_fill() {
        // int16 storage: value = raw * 0.01 + 273.15, fill -32767
        let packing = CfPacking::new(Some(-32767.0), None, Some(0.01), Some(273.15));
        let mut values = Array3::from_shape_vec((3, 1, 1), vec![-32767.0, 0.0, 1000.0]).unwrap();
        packing.unpack(&mut values);

        assert!(values[[0, 0, 0]].is_nan());
        assert_eq!(values[[1, 0, 0]], 273.15);
        assert!((values[[2, 0, 0]] - 283.15).abs() < 1e-9);
    }

    #[test]
    fn test_missing_value_fallback() {
        let packing = CfPacking::new(None, Some(-999.0), None, None);
        assert_eq!(packing.fill, Some(-999.0));
        assert!(packing.unpack_value(-999.0).is_nan());
        assert_eq!(packing.unpack_value(12.5), 12.5);
    }

    #[test]
    fn test_fill_value_wins_over_missing_value() {
        let packing = CfPacking::new(Some(-1.0), Some(-999.0), None, None);
        assert!(packing.unpack_value(-1.0).is_nan());
        assert_eq!(packing.unpack_value(-999.0), -999.0);
    }

    #[test]
    fn test_offset_only() {
        let packing = CfPacking::new(None, None, None, Some(-273.15));
        assert!(!packing.is_identity());
        assert_eq!(packing.unpack_value(273.15), 0.0);
    }
}
