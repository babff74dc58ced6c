//! File kind detection.
//!
//! Decides whether a file is a plugin, a save or an archive before any
//! decoding happens, either from its extension or from its leading bytes.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Broad category of a game data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileKind {
    /// Plugin or master file (`.esp`, `.esm`, `.esl`).
    Plugin,
    /// Saved game (`.ess`, `.fos`).
    Save,
    /// Asset archive (`.bsa`, `.ba2`).
    Archive,
    /// Anything else.
    Unknown,
}

/// Leading bytes of saved games. Checked before plugin signatures since
/// `TES4SAVEGAME` also starts with `TES4`.
const SAVE_SIGNATURES: &[&[u8]] = &[b"TESV_SAVEGAME", b"TES4SAVEGAME", b"FO3SAVEGAME", b"FO4_SAVEGAME"];

const PLUGIN_SIGNATURES: &[&[u8]] = &[b"TES4", b"TES3"];

/// `BSA\0` for Oblivion onwards, a bare version word for Morrowind, `BTDX` for BA2.
const ARCHIVE_SIGNATURES: &[&[u8]] = &[b"BSA\0", &[0x00, 0x01, 0x00, 0x00], b"BTDX"];

/// Longest signature, in bytes.
pub const SIGNATURE_LEN: usize = 13;

impl FileKind {
    /// Classify by leading bytes.
    pub fn from_signature(bytes: &[u8]) -> Self {
        if SAVE_SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
            FileKind::Save
        } else if PLUGIN_SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
            FileKind::Plugin
        } else if ARCHIVE_SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
            FileKind::Archive
        } else {
            FileKind::Unknown
        }
    }

    /// Classify by file extension, ignoring case.
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("esp" | "esm" | "esl") => FileKind::Plugin,
            Some("ess" | "fos") => FileKind::Save,
            Some("bsa" | "ba2") => FileKind::Archive,
            _ => FileKind::Unknown,
        }
    }

    /// Classify a stream by its leading bytes, restoring its position afterwards.
    pub fn sniff<R: Read + Seek + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let start = reader.stream_position()?;

        let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
        Read::take(&mut *reader, SIGNATURE_LEN as u64).read_to_end(&mut bytes)?;

        reader.seek(SeekFrom::Start(start))?;
        Ok(Self::from_signature(&bytes))
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            FileKind::Plugin => "plugin",
            FileKind::Save => "save",
            FileKind::Archive => "archive",
            FileKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
