//! Error types for gradient-fields.

use thiserror::Error;

/// Result type for field operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when handling field data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A field name that is not one of health, load or capacity.
    #[error("unknown field type: {0}")]
    UnknownField(String),
}
