//! Common utilities for espm.
//!
//! This crate provides foundational types used across all espm crates:
//!
//! - [`Tag`] - Four-character type codes for records and subrecords
//! - [`ReadExt`] - Little-endian stream reading with relative skips
//! - [`StreamRegion`] - Byte-count bookkeeping over a seekable stream

mod error;
mod reader;
mod tag;

pub use error::{Error, Result};
pub use reader::{ReadExt, StreamRegion};
pub use tag::Tag;

/// Re-export byteorder so downstream crates agree on the endianness marker.
pub use byteorder::{LittleEndian, ReadBytesExt};
