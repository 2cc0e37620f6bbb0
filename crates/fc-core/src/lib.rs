//! fc-core: stable foundation for the flight control crates.
//!
//! Contains:
//! - units (uom angle conversion for the `-deg` aliases)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact arena handles for properties)
//! - error (numeric and id errors)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{FcError, FcResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
