#![forbid(unsafe_code)]

//! DPI scale factors supplied by the host windowing layer.
//!
//! Item sizing is authored in logical units; the layout engine converts to
//! device pixels with [`ScaleFactor`] before solving, so every resolved
//! geometry is integral.

use std::fmt;

use crate::geometry::{Sides, Size};

/// Ratio of device pixels to logical units.
///
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleFactor(f32);

impl ScaleFactor {
    /// 1 logical unit = 1 device pixel.
    pub const IDENTITY: Self = Self(1.0);

    /// Create a scale factor, rejecting zero, negative, and non-finite values.
    pub fn new(factor: f32) -> Result<Self, ScaleFactorError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ScaleFactorError { factor });
        }
        Ok(Self(factor))
    }

    /// Raw factor.
    #[must_use]
    pub const fn get(self) -> f32 {
        self.0
    }

    /// Scale a logical extent to device pixels, rounding to nearest.
    #[must_use]
    pub fn apply(self, logical: u32) -> u32 {
        if self.0 == 1.0 {
            return logical;
        }
        (f64::from(logical) * f64::from(self.0))
            .round()
            .min(f64::from(u32::MAX)) as u32
    }

    /// Scale a signed logical offset to device pixels, rounding to nearest.
    #[must_use]
    pub fn apply_offset(self, logical: i32) -> i32 {
        if self.0 == 1.0 {
            return logical;
        }
        (f64::from(logical) * f64::from(self.0))
            .round()
            .clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    }

    /// Scale an optional upper bound; `None` stays unbounded.
    #[must_use]
    pub fn apply_max(self, logical: Option<u32>) -> Option<u32> {
        logical.map(|v| self.apply(v))
    }

    /// Scale both dimensions of a size.
    #[must_use]
    pub fn apply_size(self, logical: Size) -> Size {
        Size::new(self.apply(logical.width), self.apply(logical.height))
    }

    /// Scale every side of a margin.
    #[must_use]
    pub fn apply_sides(self, logical: Sides) -> Sides {
        Sides::new(
            self.apply(logical.top),
            self.apply(logical.right),
            self.apply(logical.bottom),
            self.apply(logical.left),
        )
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// Rejected scale factor value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactorError {
    pub factor: f32,
}

impl fmt::Display for ScaleFactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid scale factor {} (must be finite and > 0)",
            self.factor
        )
    }
}

impl std::error::Error for ScaleFactorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_passthrough() {
        let s = ScaleFactor::IDENTITY;
        assert_eq!(s.apply(37), 37);
        assert_eq!(s.apply_offset(-5), -5);
        assert_eq!(s.apply_max(None), None);
    }

    #[test]
    fn fractional_scale_rounds_to_nearest() {
        let s = ScaleFactor::new(1.5).expect("valid scale");
        assert_eq!(s.apply(3), 5); // 4.5 rounds away from zero
        assert_eq!(s.apply(10), 15);
        assert_eq!(s.apply_offset(-3), -5);
        assert_eq!(s.apply_max(Some(4)), Some(6));
    }

    #[test]
    fn scale_saturates() {
        let s = ScaleFactor::new(4.0).expect("valid scale");
        assert_eq!(s.apply(u32::MAX), u32::MAX);
    }

    #[test]
    fn rejects_degenerate_factors() {
        assert!(ScaleFactor::new(0.0).is_err());
        assert!(ScaleFactor::new(-1.0).is_err());
        assert!(ScaleFactor::new(f32::NAN).is_err());
        assert!(ScaleFactor::new(f32::INFINITY).is_err());
    }

    #[test]
    fn sizes_and_sides_scale_componentwise() {
        let s = ScaleFactor::new(2.0).expect("valid scale");
        assert_eq!(s.apply_size(Size::new(3, 4)), Size::new(6, 8));
        assert_eq!(s.apply_sides(Sides::new(1, 2, 3, 4)), Sides::new(2, 4, 6, 8));
    }

    #[test]
    fn error_message_names_factor() {
        let err = ScaleFactor::new(-2.0).unwrap_err();
        assert!(err.to_string().contains("-2"));
    }
}
