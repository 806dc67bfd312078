//! Float helpers shared by the codec, the report parsers and the search.

use crate::CoreError;

/// Absolute and relative slack for float comparisons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Tolerances {
    /// Values that went through a six-decimal card and back.
    pub const FILE_PRECISION: Tolerances = Tolerances {
        abs: 1e-12,
        rel: 1e-6,
    };

    pub fn allows(&self, a: f64, b: f64) -> bool {
        let diff = (a - b).abs();
        diff <= self.abs || diff <= self.rel * a.abs().max(b.abs())
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::FILE_PRECISION
    }
}

pub fn nearly_equal(a: f64, b: f64, tol: Tolerances) -> bool {
    tol.allows(a, b)
}

pub fn ensure_finite(value: f64, what: &'static str) -> Result<f64, CoreError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::NonFinite { what, value })
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// NaN-tolerant comparison key: smaller is closer.
#[inline]
pub fn distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs();
    if d.is_nan() { f64::INFINITY } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_precision_accepts_six_decimal_noise() {
        let tol = Tolerances::default();
        assert!(nearly_equal(0.024, 0.024_000_01, tol));
        assert!(nearly_equal(6.0, 6.000_001, tol));
        assert!(!nearly_equal(6.0, 6.001, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
    }

    #[test]
    fn non_finite_values_name_the_field() {
        let err = ensure_finite(f64::INFINITY, "span").unwrap_err();
        assert_eq!(
            err,
            CoreError::NonFinite {
                what: "span",
                value: f64::INFINITY
            }
        );
        assert_eq!(ensure_finite(4.0, "span"), Ok(4.0));
    }

    #[test]
    fn round_to_six_places() {
        assert_eq!(round_to(1.234_567_89, 6), 1.234_568);
        assert_eq!(round_to(-0.000_000_4, 6), 0.0);
    }

    #[test]
    fn distance_treats_nan_as_far() {
        assert_eq!(distance(f64::NAN, 1.0), f64::INFINITY);
        assert_eq!(distance(3.0, 1.0), 2.0);
    }
}
