//! Angle units used by the engine's standard bindings.

use uom::si::angle::{degree, radian};
use uom::si::f64::Angle;

pub fn rad(v: f64) -> Angle {
    Angle::new::<radian>(v)
}

pub fn to_deg(a: Angle) -> f64 {
    a.get::<degree>()
}

/// Degrees per radian, derived from the unit system rather than hard-coded.
pub fn deg_per_rad() -> f64 {
    to_deg(rad(1.0))
}
