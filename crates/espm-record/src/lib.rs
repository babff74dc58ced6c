//! Record and subrecord decoder for Bethesda plugin files.
//!
//! Plugin files (`.esp`, `.esm`, `.esl`) are a flat sequence of records. Each
//! record has a fixed header followed by a payload of subrecords, and the
//! header layout depends on which engine wrote the file.
//!
//! # Record Header
//!
//! All integers are little-endian:
//! - 4 bytes: Type tag (consumed, not kept)
//! - 4 bytes: Payload size
//! - 4 bytes: Unknown (Morrowind only)
//! - 4 bytes: Flags
//! - 4 bytes: Identifier (all games after Morrowind)
//! - 4 or 8 bytes: Padding (4 for Oblivion, 8 for later games)
//!
//! # Subrecord Header
//!
//! - 4 bytes: Type tag
//! - 2 or 4 bytes: Data size (4 for Morrowind, 2 for later games)
//!
//! Later games prefix subrecords larger than 65535 bytes with an `XXXX`
//! subrecord holding the real size.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use espm_record::{GameId, Record};
//!
//! let mut reader = BufReader::new(File::open("Skyrim.esm")?);
//! let header = Record::read(&mut reader, GameId::Skyrim, false)?;
//!
//! for subrecord in header.subrecords() {
//!     println!("{}: {} bytes", subrecord.tag(), subrecord.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod decompress;
mod error;
mod game;
mod record;
mod subrecord;

pub use error::{Error, Result};
pub use game::{GameId, HeaderLayout, SizeWidth, SubrecordLayout, COMPRESSED_FLAG, TAG_LEN};
pub use record::{ReadOptions, Record, RecordHeader};
pub use subrecord::Subrecord;
