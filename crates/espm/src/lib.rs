//! espm - Bethesda plugin file reading library.
//!
//! This crate ties the espm crates together: it opens plugin files, tells
//! plugins apart from saves and archives, and walks every record and group
//! in a file using the record layout of a chosen game.
//!
//! # Crates
//!
//! - [`espm_common`] - Common utilities (stream helpers, type tags)
//! - [`espm_record`] - Record and subrecord decoding for every supported game
//!
//! # Example
//!
//! ```no_run
//! use espm::prelude::*;
//!
//! let plugin = Plugin::load("Data/Skyrim.esm")?;
//! let header = plugin.read_header(GameId::SkyrimSE)?;
//! println!("{}: flags {:#x}", plugin.name(), header.flags());
//!
//! for entry in plugin.reader(GameId::SkyrimSE)? {
//!     if let Entry::Record { tag, record, .. } = entry? {
//!         println!("{} {:08x}", tag, record.identifier());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod kind;
mod plugin;
mod reader;

pub use espm_common as common;
pub use espm_record as record;

pub use error::{Error, Result};
pub use kind::{FileKind, SIGNATURE_LEN};
pub use plugin::{read_header, Plugin};
pub use reader::{DriverOptions, Entry, GroupHeader, PluginReader};

pub use espm_common::Tag;
pub use espm_record::{GameId, ReadOptions, Record, RecordHeader, Subrecord};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{DriverOptions, Entry, FileKind, GroupHeader, Plugin, PluginReader};
    pub use espm_common::{ReadExt, Tag};
    pub use espm_record::{GameId, ReadOptions, Record, RecordHeader, Subrecord};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
