//! Value conversion errors.

use thiserror::Error;

/// Errors raised when a [`crate::Value`] cannot be converted.
#[derive(Debug, Error)]
pub enum Error {
    /// The value has a different runtime type than requested.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}
