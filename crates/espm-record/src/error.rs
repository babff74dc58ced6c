//! Error types for record decoding.

use thiserror::Error;

/// Errors that can occur when decoding records and subrecords.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error, including the stream ending inside a structure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrecognised game name.
    #[error("unknown game: {0}")]
    UnknownGame(String),

    /// Compressed payload too small to hold its length prefix.
    #[error("compressed record payload of {0} bytes is too short for its size prefix")]
    CompressedPayloadTooShort(u32),

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Decompressed size mismatch.
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

impl Error {
    /// Check whether this error is the stream running out of data.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, Error>;
