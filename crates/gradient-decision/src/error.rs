//! Error types for gradient-decision.

use thiserror::Error;

/// Result type for routing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when configuring the router.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// A weight is NaN or infinite.
    #[error("router weight {name} must be finite, got {value}")]
    NonFiniteWeight { name: &'static str, value: f64 },

    /// Temperature is negative, NaN or infinite.
    #[error("temperature must be finite and non-negative, got {0}")]
    InvalidTemperature(f64),
}
