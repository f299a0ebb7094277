use thiserror::Error;

use crate::Convention;

/// Rejected input to one of the value types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// Two angles with different convention tags were combined without
    /// converting one of them first.
    #[error("cannot combine {left:?} angle with {right:?} angle without an explicit conversion")]
    ConventionMismatch { left: Convention, right: Convention },

    /// A NaN or infinite value was supplied.
    #[error("{what} must be finite, got {value}")]
    NonFinite { what: &'static str, value: f64 },

    /// A finite value outside its permitted range.
    #[error("{what} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}
