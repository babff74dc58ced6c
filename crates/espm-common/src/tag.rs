//! Four-character type tags.
//!
//! Every record, group and subrecord in a plugin file starts with a 4-byte
//! type code such as `TES4`, `GRUP` or `EDID`. Unknown codes are kept as-is.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A 4-byte type code.
///
/// Displayed as ASCII when every byte is printable, and as a hex escape
/// sequence otherwise, so corrupt tags stay readable in diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// File header record used from Oblivion onwards.
    pub const TES4: Self = Self(*b"TES4");
    /// File header record used by Morrowind.
    pub const TES3: Self = Self(*b"TES3");
    /// Record group.
    pub const GRUP: Self = Self(*b"GRUP");
    /// Large subrecord size marker.
    pub const XXXX: Self = Self(*b"XXXX");
    /// Editor ID subrecord.
    pub const EDID: Self = Self(*b"EDID");
    /// Header subrecord of the file header record.
    pub const HEDR: Self = Self(*b"HEDR");

    /// Create a tag from raw bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the tag.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Check whether every byte is printable ASCII.
    #[inline]
    pub fn is_printable(&self) -> bool {
        self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ')
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl PartialEq<[u8; 4]> for Tag {
    fn eq(&self, other: &[u8; 4]) -> bool {
        &self.0 == other
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            // Printable bytes are valid single-byte UTF-8.
            for &b in &self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            for &b in &self.0 {
                write!(f, "\\x{:02x}", b)?;
            }
            Ok(())
        }
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| Error::InvalidTag(s.to_string()))?;
        Ok(Self(bytes))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_ascii() {
        assert_eq!(Tag::TES4.to_string(), "TES4");
        assert_eq!(Tag(*b"DATA").to_string(), "DATA");
    }

    #[test]
    fn test_display_non_printable() {
        let tag = Tag([0x00, 0x01, b'A', 0xff]);
        assert_eq!(tag.to_string(), "\\x00\\x01\\x41\\xff");
    }

    #[test]
    fn test_parse() {
        let tag: Tag = "EDID".parse().unwrap();
        assert_eq!(tag, Tag::EDID);
        assert_eq!(tag, *b"EDID");
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!("ED".parse::<Tag>().is_err());
        assert!("EDIDX".parse::<Tag>().is_err());
    }
}
