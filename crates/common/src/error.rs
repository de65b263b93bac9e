//! Common error types for dirchain.

use thiserror::Error;

/// Common result type for dirchain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for dirchain.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
