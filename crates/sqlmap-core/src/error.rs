//! Core error types.

use sqlmap_lang::ParseError;
use thiserror::Error;

use crate::driver::DriverError;

/// Errors raised while configuring or executing statements.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or inconsistent descriptors: duplicate ids, dangling
    /// references, unresolvable type handlers.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A parameter could not be read from or written to the parameter object.
    #[error("binding error: {0}")]
    Binding(String),

    /// A row could not be turned into an object.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// Error reported by the database driver.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// A statement template failed to parse.
    #[error("template error: {0}")]
    Template(#[from] ParseError),

    /// A cache model failed to store or restore an entry.
    #[error("cache error: {0}")]
    Cache(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub(crate) fn binding(message: impl Into<String>) -> Self {
        Error::Binding(message.into())
    }

    pub(crate) fn mapping(message: impl Into<String>) -> Self {
        Error::Mapping(message.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for sqlmap operations.
pub type Result<T> = std::result::Result<T, Error>;
