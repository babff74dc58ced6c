//! Error types for espm-common.

use thiserror::Error;

/// Common error type for espm operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A type tag string was not exactly four bytes.
    #[error("invalid type tag {0:?}: expected exactly 4 bytes")]
    InvalidTag(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
