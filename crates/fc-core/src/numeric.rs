use crate::FcError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Equality up to a few ulps of the larger magnitude.
///
/// Used to terminate iterative motion (kinematic travel) without chasing roundoff.
pub fn equal_to_roundoff(a: Real, b: Real) -> bool {
    let eps = 2.0 * Real::EPSILON;
    (a - b).abs() <= eps * a.abs().max(b.abs())
}

/// Clamp `value` into `[min, max]`. Unlike `f64::clamp`, never panics on `min > max`;
/// the lower bound wins.
pub fn constrain(min: Real, value: Real, max: Real) -> Real {
    if value < min {
        min
    } else if value > max {
        max.max(min)
    } else {
        value
    }
}

/// Pass `v` through, or report it as `what`.
pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, FcError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(FcError::NonFinite { what, value: v })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn constrain_stays_in_bounds(a in -1e6f64..1e6, b in -1e6f64..1e6, v in -1e7f64..1e7) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let c = constrain(lo, v, hi);
            prop_assert!(c >= lo && c <= hi);
            prop_assert_eq!(constrain(lo, c, hi), c);
        }

        #[test]
        fn nearly_equal_is_symmetric(a in -1e3f64..1e3, d in -1e-6f64..1e-6) {
            let tol = Tolerances::default();
            prop_assert_eq!(nearly_equal(a, a + d, tol), nearly_equal(a + d, a, tol));
        }
    }
}
