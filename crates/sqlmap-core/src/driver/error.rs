//! Driver error type.

use thiserror::Error;

/// Errors reported by a database driver.
///
/// Driver crates build these from their native errors; the pipeline passes
/// them to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    /// Opening a connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Preparing or running a command failed.
    #[error("command failed: {0}")]
    Command(String),

    /// Begin/commit/rollback failed.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// A column or parameter value has a type the driver cannot carry.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// The driver does not support the requested feature.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
