//! Plugin file handle.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use espm_common::{ReadExt, Tag};
use espm_record::{GameId, ReadOptions, Record};
use log::{debug, info};

use crate::{DriverOptions, Error, FileKind, PluginReader, Result};

/// A plugin file on disk.
///
/// Loading only checks that the file can be opened; records are decoded
/// on demand through [`Plugin::read_header`] or a [`PluginReader`].
#[derive(Debug, Clone)]
pub struct Plugin {
    path: PathBuf,
    name: String,
    len: u64,
}

impl Plugin {
    /// Open a plugin file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = open(path)?;
        let len = file.metadata()?.len();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!("Loaded plugin {} ({} bytes)", name, len);

        Ok(Self {
            path: path.to_path_buf(),
            name,
            len,
        })
    }

    /// Get the file name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the path the plugin was loaded from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the file size in bytes at load time.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check whether the file was empty at load time.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Open a fresh buffered stream positioned at the start of the file.
    pub fn open(&self) -> Result<BufReader<File>> {
        Ok(BufReader::new(open(&self.path)?))
    }

    /// Classify the file by its leading bytes.
    pub fn kind(&self) -> Result<FileKind> {
        let mut reader = self.open()?;
        Ok(FileKind::sniff(&mut reader)?)
    }

    /// Walk the whole file with default options.
    pub fn reader(&self, game: GameId) -> Result<PluginReader<BufReader<File>>> {
        self.reader_with(game, DriverOptions::default())
    }

    /// Walk the whole file with explicit options.
    pub fn reader_with(
        &self,
        game: GameId,
        options: DriverOptions,
    ) -> Result<PluginReader<BufReader<File>>> {
        debug!("Walking {} as {}", self.name, game);
        Ok(PluginReader::with_options(self.open()?, game, options))
    }

    /// Decode the file header record (`TES3` or `TES4`) with its subrecords.
    pub fn read_header(&self, game: GameId) -> Result<Record> {
        let mut reader = self.open()?;
        read_header(&mut reader, game)
    }
}

/// Decode the file header record at the reader's current position.
pub fn read_header<R: Read + Seek + ?Sized>(reader: &mut R, game: GameId) -> Result<Record> {
    let tag = reader.try_read_tag()?.ok_or(Error::Empty)?;
    if tag != Tag::TES4 && tag != Tag::TES3 {
        return Err(Error::NotAPlugin(tag));
    }

    Ok(Record::read_after_tag(reader, game, &ReadOptions::default())?)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn header_record() -> Vec<u8> {
        let mut payload = b"HEDR".to_vec();
        payload.extend(12u16.to_le_bytes());
        payload.extend(1.7f32.to_le_bytes());
        payload.extend(3u32.to_le_bytes());
        payload.extend(0x800u32.to_le_bytes());
        payload.extend(b"CNAM\x07\x00author\0");

        let mut out = b"TES4".to_vec();
        out.extend((payload.len() as u32).to_le_bytes());
        out.extend(1u32.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend([0u8; 8]);
        out.extend(payload);
        out
    }

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("espm-{}-{}", std::process::id(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_read_header_from_stream() {
        let mut cursor = Cursor::new(header_record());
        let record = read_header(&mut cursor, GameId::SkyrimSE).unwrap();

        assert_eq!(record.flags(), 1);
        assert_eq!(record.subrecords().len(), 2);
        assert_eq!(record.subrecord(Tag::HEDR).unwrap().len(), 12);
        assert_eq!(cursor.position(), header_record().len() as u64);
    }

    #[test]
    fn test_read_header_rejects_other_tags() {
        let mut data = header_record();
        data[..4].copy_from_slice(b"WEAP");

        let result = read_header(&mut Cursor::new(data), GameId::SkyrimSE);
        assert!(matches!(result, Err(Error::NotAPlugin(tag)) if tag == Tag(*b"WEAP")));
    }

    #[test]
    fn test_read_header_empty() {
        let result = read_header(&mut Cursor::new(Vec::new()), GameId::Skyrim);
        assert!(matches!(result, Err(Error::Empty)));
    }

    #[test]
    fn test_load_and_walk() {
        let path = temp_file("walk.esm", &header_record());

        let plugin = Plugin::load(&path).unwrap();
        assert_eq!(plugin.name(), path.file_name().unwrap().to_string_lossy());
        assert_eq!(plugin.len(), header_record().len() as u64);
        assert_eq!(plugin.kind().unwrap(), FileKind::Plugin);

        let header = plugin.read_header(GameId::Skyrim).unwrap();
        assert_eq!(header.subrecords()[1].data(), b"author\0");

        let entries: Vec<_> = plugin
            .reader(GameId::Skyrim)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tag(), Tag::TES4);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("espm-definitely-missing.esp");
        let err = Plugin::load(&path).unwrap_err();

        match err {
            Error::Open { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected open error, got {:?}", other),
        }
    }
}
