//! Whole-file traversal.
//!
//! [`PluginReader`] walks a plugin from its current position to the end,
//! yielding records and the `GRUP` containers that wrap them in every engine
//! after Morrowind. Group contents are either walked in order or skipped
//! wholesale.

use std::io::{Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};
use espm_common::{ReadExt, Tag};
use espm_record::{GameId, ReadOptions, Record, TAG_LEN};
use log::{debug, trace};

use crate::{Error, Result};

/// Fixed group header fields shared by every engine: tag, size, label, type.
const GROUP_FIXED_LEN: u64 = 16;

/// A decoded `GRUP` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupHeader {
    /// Total group size, header included.
    pub size: u32,
    /// Label; a record tag for top-level groups, otherwise type-dependent.
    pub label: [u8; 4],
    /// Group type (0 for top-level groups).
    pub group_type: u32,
}

impl GroupHeader {
    /// Decode a group header, tag included. The header is as long as a
    /// record header for the same game.
    pub fn read<R: Read + ?Sized>(reader: &mut R, game: GameId) -> Result<Self> {
        reader.discard_bytes(TAG_LEN)?;
        Self::read_after_tag(reader, game)
    }

    /// Decode the group header fields that follow an already consumed `GRUP` tag.
    pub fn read_after_tag<R: Read + ?Sized>(reader: &mut R, game: GameId) -> Result<Self> {
        let header_len = game.header_layout().header_len();

        let size = reader.read_u32::<LittleEndian>()?;
        let mut label = [0u8; 4];
        reader.read_exact(&mut label)?;
        let group_type = reader.read_u32::<LittleEndian>()?;
        reader.discard_bytes(header_len.saturating_sub(GROUP_FIXED_LEN))?;

        Ok(Self {
            size,
            label,
            group_type,
        })
    }

    /// Label as a tag, meaningful for top-level groups.
    pub fn label_tag(&self) -> Tag {
        Tag(self.label)
    }

    /// Byte length of the group contents, or `None` if the declared size is
    /// smaller than the header.
    pub fn contents_len(&self, game: GameId) -> Option<u64> {
        u64::from(self.size).checked_sub(game.header_layout().header_len())
    }
}

/// One item produced by a [`PluginReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Start of a group. When descending, its contents follow as entries
    /// one level deeper.
    Group {
        offset: u64,
        depth: usize,
        header: GroupHeader,
    },
    /// A record.
    Record {
        offset: u64,
        depth: usize,
        tag: Tag,
        record: Record,
    },
}

impl Entry {
    /// Stream offset of the entry's first byte.
    pub fn offset(&self) -> u64 {
        match self {
            Entry::Group { offset, .. } | Entry::Record { offset, .. } => *offset,
        }
    }

    /// Number of enclosing groups.
    pub fn depth(&self) -> usize {
        match self {
            Entry::Group { depth, .. } | Entry::Record { depth, .. } => *depth,
        }
    }

    /// Type tag; `GRUP` for groups.
    pub fn tag(&self) -> Tag {
        match self {
            Entry::Group { .. } => Tag::GRUP,
            Entry::Record { tag, .. } => *tag,
        }
    }

    /// The record, if this entry is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Entry::Record { record, .. } => Some(record),
            Entry::Group { .. } => None,
        }
    }
}

/// Options for a [`PluginReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Walk into groups instead of skipping their contents.
    pub descend_groups: bool,
    /// Options passed to every record read.
    pub read: ReadOptions,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            descend_groups: true,
            read: ReadOptions::default(),
        }
    }
}

/// Sequential reader over the entries of a plugin stream.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use espm::{GameId, PluginReader};
///
/// let file = BufReader::new(File::open("Skyrim.esm")?);
/// for entry in PluginReader::new(file, GameId::SkyrimSE) {
///     let entry = entry?;
///     println!("{:>10x} {}", entry.offset(), entry.tag());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PluginReader<R> {
    reader: R,
    game: GameId,
    options: DriverOptions,
    /// End offsets of the groups currently being walked, innermost last.
    group_ends: Vec<u64>,
    done: bool,
}

impl<R: Read + Seek> PluginReader<R> {
    /// Create a reader with default options.
    pub fn new(reader: R, game: GameId) -> Self {
        Self::with_options(reader, game, DriverOptions::default())
    }

    /// Create a reader with explicit options.
    pub fn with_options(reader: R, game: GameId, options: DriverOptions) -> Self {
        Self {
            reader,
            game,
            options,
            group_ends: Vec::new(),
            done: false,
        }
    }

    /// Game whose layout is used.
    pub fn game(&self) -> GameId {
        self.game
    }

    /// Current stream position.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.reader.stream_position()?)
    }

    /// Consume the driver, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next entry, or `None` at a clean end of stream.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        if self.done {
            return Ok(None);
        }

        let offset = self.reader.stream_position()?;
        while let Some(&end) = self.group_ends.last() {
            if offset < end {
                break;
            }
            trace!("leaving group ending at {:#x}", end);
            self.group_ends.pop();
        }
        let depth = self.group_ends.len();

        let Some(tag) = self.reader.try_read_tag()? else {
            self.done = true;
            if let Some(&end) = self.group_ends.last() {
                return Err(Error::TruncatedGroup { offset, end });
            }
            return Ok(None);
        };

        if tag == Tag::GRUP && self.game.header_layout().has_groups {
            let header = GroupHeader::read_after_tag(&mut self.reader, self.game)?;
            let contents_len = header.contents_len(self.game).ok_or(Error::InvalidGroupSize {
                offset,
                size: header.size,
            })?;

            if self.options.descend_groups {
                trace!(
                    "entering group {} type {} at {:#x}",
                    header.label_tag(),
                    header.group_type,
                    offset
                );
                self.group_ends.push(offset + u64::from(header.size));
            } else {
                debug!(
                    "skipping group {} at {:#x} ({} bytes)",
                    header.label_tag(),
                    offset,
                    contents_len
                );
                self.reader.skip_bytes(contents_len)?;
            }

            return Ok(Some(Entry::Group {
                offset,
                depth,
                header,
            }));
        }

        let record = Record::read_after_tag(&mut self.reader, self.game, &self.options.read)?;
        trace!(
            "record {} {:08x} at {:#x} ({} subrecords)",
            tag,
            record.identifier(),
            offset,
            record.subrecords().len()
        );

        Ok(Some(Entry::Record {
            offset,
            depth,
            tag,
            record,
        }))
    }
}

impl<R: Read + Seek> Iterator for PluginReader<R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                debug!("stopping after error: {}", e);
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
