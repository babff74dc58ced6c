//! Game engine identifiers and their on-disk layouts.
//!
//! Each engine generation lays out record and subrecord headers slightly
//! differently. The differences are captured once here, in
//! [`GameId::header_layout`] and [`GameId::subrecord_layout`], and both
//! decoders consult those tables instead of branching on the game directly.
//!
//! | Game      | Record header | Subrecord size | `XXXX` marker |
//! |-----------|---------------|----------------|---------------|
//! | Morrowind | 16 bytes      | u32            | no            |
//! | Oblivion  | 20 bytes      | u16            | yes           |
//! | others    | 24 bytes      | u16            | yes           |

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use byteorder::{LittleEndian, ReadBytesExt};
use espm_common::Tag;

use crate::Error;

/// Length of every type tag.
pub const TAG_LEN: u64 = 4;

/// Record flag marking a zlib-compressed payload (Oblivion onwards).
pub const COMPRESSED_FLAG: u32 = 0x0004_0000;

/// The engine that produced a plugin file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GameId {
    Morrowind,
    Oblivion,
    Fallout3,
    FalloutNV,
    Skyrim,
    SkyrimSE,
    Fallout4,
}

impl GameId {
    /// Every supported game, oldest engine first.
    pub const ALL: [GameId; 7] = [
        GameId::Morrowind,
        GameId::Oblivion,
        GameId::Fallout3,
        GameId::FalloutNV,
        GameId::Skyrim,
        GameId::SkyrimSE,
        GameId::Fallout4,
    ];

    /// Record header layout for this game.
    pub const fn header_layout(self) -> HeaderLayout {
        match self {
            GameId::Morrowind => HeaderLayout {
                has_unknown_padding: true,
                has_identifier: false,
                trailing_pad_bytes: 0,
                compressed_flag: None,
                has_groups: false,
            },
            GameId::Oblivion => HeaderLayout {
                has_unknown_padding: false,
                has_identifier: true,
                trailing_pad_bytes: 4,
                compressed_flag: Some(COMPRESSED_FLAG),
                has_groups: true,
            },
            GameId::Fallout3
            | GameId::FalloutNV
            | GameId::Skyrim
            | GameId::SkyrimSE
            | GameId::Fallout4 => HeaderLayout {
                has_unknown_padding: false,
                has_identifier: true,
                trailing_pad_bytes: 8,
                compressed_flag: Some(COMPRESSED_FLAG),
                has_groups: true,
            },
        }
    }

    /// Subrecord header layout for this game.
    pub const fn subrecord_layout(self) -> SubrecordLayout {
        match self {
            GameId::Morrowind => SubrecordLayout {
                size_width: SizeWidth::U32,
                large_size_marker: None,
            },
            _ => SubrecordLayout {
                size_width: SizeWidth::U16,
                large_size_marker: Some(Tag::XXXX),
            },
        }
    }

    /// Short lowercase name, as accepted by [`GameId::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            GameId::Morrowind => "morrowind",
            GameId::Oblivion => "oblivion",
            GameId::Fallout3 => "fallout3",
            GameId::FalloutNV => "falloutnv",
            GameId::Skyrim => "skyrim",
            GameId::SkyrimSE => "skyrimse",
            GameId::Fallout4 => "fallout4",
        }
    }

    /// Parse from a short name, ignoring case.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "morrowind" | "tes3" => Some(GameId::Morrowind),
            "oblivion" | "tes4" => Some(GameId::Oblivion),
            "fallout3" | "fo3" => Some(GameId::Fallout3),
            "falloutnv" | "fnv" => Some(GameId::FalloutNV),
            "skyrim" | "tes5" => Some(GameId::Skyrim),
            "skyrimse" | "sse" => Some(GameId::SkyrimSE),
            "fallout4" | "fo4" => Some(GameId::Fallout4),
            _ => None,
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownGame(s.to_string()))
    }
}

/// Which optional fields a record header carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Four unknown bytes between the payload size and the flags.
    pub has_unknown_padding: bool,
    /// A u32 identifier follows the flags.
    pub has_identifier: bool,
    /// Bytes skipped after the identifier to reach the end of the header.
    pub trailing_pad_bytes: u32,
    /// Flag bit marking a compressed payload, if the engine has one.
    pub compressed_flag: Option<u32>,
    /// Records are wrapped in `GRUP` containers.
    pub has_groups: bool,
}

impl HeaderLayout {
    /// Full header length, type tag included.
    pub const fn header_len(&self) -> u64 {
        self.header_len_after_tag() + TAG_LEN
    }

    /// Header length following the type tag.
    pub const fn header_len_after_tag(&self) -> u64 {
        let mut len = 4 + 4; // payload size + flags
        if self.has_unknown_padding {
            len += 4;
        }
        if self.has_identifier {
            len += 4 + self.trailing_pad_bytes as u64;
        }
        len
    }

    /// Check whether `flags` mark a compressed payload under this layout.
    pub const fn is_compressed(&self, flags: u32) -> bool {
        match self.compressed_flag {
            Some(bit) => flags & bit != 0,
            None => false,
        }
    }
}

/// Width of a subrecord's size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeWidth {
    U16,
    U32,
}

impl SizeWidth {
    /// Number of bytes the field occupies.
    pub const fn bytes(self) -> u64 {
        match self {
            SizeWidth::U16 => 2,
            SizeWidth::U32 => 4,
        }
    }

    /// Read a size field of this width.
    pub fn read<R: Read + ?Sized>(self, reader: &mut R) -> std::io::Result<u32> {
        match self {
            SizeWidth::U16 => reader.read_u16::<LittleEndian>().map(u32::from),
            SizeWidth::U32 => reader.read_u32::<LittleEndian>(),
        }
    }
}

/// How a subrecord header is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubrecordLayout {
    /// Width of the size field after the tag.
    pub size_width: SizeWidth,
    /// Tag of a subrecord carrying the real size of the one after it.
    pub large_size_marker: Option<Tag>,
}

impl SubrecordLayout {
    /// Header length, tag included.
    pub const fn header_len(&self) -> u64 {
        TAG_LEN + self.size_width.bytes()
    }

    /// Check whether `tag` is this layout's large-size marker.
    pub fn is_large_size_marker(&self, tag: Tag) -> bool {
        self.large_size_marker == Some(tag)
    }
}
