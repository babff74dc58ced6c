//! Error types for the espm crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when working with plugin files.
#[derive(Debug, Error)]
pub enum Error {
    /// The plugin file could not be opened.
    #[error("cannot open plugin file at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record decoding error.
    #[error("{0}")]
    Record(#[from] espm_record::Error),

    /// The file does not start with a plugin header record.
    #[error("not a plugin file: first tag is {0}")]
    NotAPlugin(espm_common::Tag),

    /// The file is empty.
    #[error("empty file")]
    Empty,

    /// A group declares a size smaller than its own header.
    #[error("group at offset {offset:#x} has invalid size {size}")]
    InvalidGroupSize { offset: u64, size: u32 },

    /// The stream ended before an enclosing group did.
    #[error("stream ended at offset {offset:#x} inside a group ending at {end:#x}")]
    TruncatedGroup { offset: u64, end: u64 },
}

/// Result type for espm operations.
pub type Result<T> = std::result::Result<T, Error>;
