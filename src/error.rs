//! Error type shared by every positioner component.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type PositionerResult<T> = Result<T, PositionerError>;

/// Errors raised by positioner geometry, kinematics and instruction handling.
///
/// Mutators validate before committing, so an `Err` always leaves the target
/// object exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionerError {
    /// A precondition on a caller-supplied value was violated.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The value is well formed but the object is in the wrong state for it.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A value outside the set the type admits reached a dispatch point.
    #[error("Impossible state: {0}")]
    ImpossibleState(String),
}

impl PositionerError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

/// Fails with [`PositionerError::InvalidArgument`] unless `value` is finite and `>= 0`.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> PositionerResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(PositionerError::invalid_argument(format!(
            "{name} must be a finite non-negative value, got {value}"
        )));
    }
    Ok(())
}

/// Fails with [`PositionerError::InvalidArgument`] unless `value` is finite and `> 0`.
pub(crate) fn ensure_positive(name: &str, value: f64) -> PositionerResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PositionerError::invalid_argument(format!(
            "{name} must be a finite positive value, got {value}"
        )));
    }
    Ok(())
}
