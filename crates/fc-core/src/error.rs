//! Errors raised by the shared numeric and id helpers.

use thiserror::Error;

pub type FcResult<T> = Result<T, FcError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FcError {
    #[error("{what} is not finite: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("No id available for slot {slot}")]
    IdOverflow { slot: usize },
}
