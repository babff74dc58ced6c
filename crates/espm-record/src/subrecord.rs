//! Subrecord decoding.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use espm_common::{ReadExt, Tag};

use crate::{GameId, Result};

/// A typed, length-prefixed chunk of a record's payload.
///
/// The data is kept verbatim; its meaning depends on the enclosing record
/// type and is not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subrecord {
    tag: Tag,
    data: Vec<u8>,
}

impl Subrecord {
    /// Create a subrecord from its parts.
    pub fn new(tag: Tag, data: Vec<u8>) -> Self {
        Self { tag, data }
    }

    /// Decode one subrecord at the reader's current position.
    ///
    /// On success the reader sits on the first byte after the subrecord. If
    /// the game's layout has a large-size marker, a marker subrecord is folded
    /// into the subrecord after it: the marker's u32 payload replaces that
    /// subrecord's size field, and the returned value is the second subrecord.
    pub fn read<R: Read + ?Sized>(reader: &mut R, game: GameId) -> Result<Self> {
        let layout = game.subrecord_layout();

        let tag = reader.read_tag()?;
        let size = layout.size_width.read(reader)?;

        if layout.is_large_size_marker(tag) && size == 4 {
            let real_size = reader.read_u32::<LittleEndian>()?;
            let tag = reader.read_tag()?;
            // The size field of the oversized subrecord is a placeholder.
            layout.size_width.read(reader)?;
            let data = reader.read_vec(u64::from(real_size))?;
            return Ok(Self { tag, data });
        }

        let data = reader.read_vec(u64::from(size))?;
        Ok(Self { tag, data })
    }

    /// Get the type tag.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Get the raw data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the subrecord, returning its data.
    #[inline]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Data length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the subrecord has no data.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
