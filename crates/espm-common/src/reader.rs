//! Stream reading helpers.
//!
//! Plugin files are decoded straight from a positioned stream rather than a
//! buffered slice, so every helper here reads or seeks exactly the bytes it
//! names and nothing more. Integers go through [`byteorder`] as little-endian.

use std::io::{self, Read, Seek, SeekFrom};

use crate::Tag;

/// Extension methods for reading plugin structures from a stream.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use espm_common::{ReadExt, Tag};
///
/// let mut cursor = Cursor::new(b"TES4\x01\x02GRUP".to_vec());
///
/// assert_eq!(cursor.read_tag().unwrap(), Tag::TES4);
/// cursor.skip_bytes(2).unwrap();
/// assert_eq!(cursor.try_read_tag().unwrap(), Some(Tag::GRUP));
/// assert_eq!(cursor.try_read_tag().unwrap(), None);
/// ```
pub trait ReadExt: Read {
    /// Read a 4-byte type tag.
    fn read_tag(&mut self) -> io::Result<Tag> {
        let mut bytes = [0u8; 4];
        self.read_exact(&mut bytes)?;
        Ok(Tag(bytes))
    }

    /// Read and throw away exactly `count` bytes.
    ///
    /// Unlike [`ReadExt::skip_bytes`] this fails when the stream ends early,
    /// which is what fixed header fields need.
    fn discard_bytes(&mut self, count: u64) -> io::Result<()> {
        let read = io::copy(&mut Read::take(&mut *self, count), &mut io::sink())?;
        if read < count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("needed {} bytes but only {} available", count, read),
            ));
        }
        Ok(())
    }

    /// Read exactly `len` bytes into a new buffer.
    ///
    /// The buffer grows with the data actually read, so a corrupt length
    /// field cannot force a huge up-front allocation.
    fn read_vec(&mut self, len: u64) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        let read = Read::take(&mut *self, len).read_to_end(&mut data)?;
        if (read as u64) < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("needed {} bytes but only {} available", len, read),
            ));
        }
        Ok(data)
    }

    /// Advance the stream by `count` bytes without reading them.
    ///
    /// Fails with `UnexpectedEof` when fewer than `count` bytes remain; the
    /// stream is then left at its end.
    fn skip_bytes(&mut self, count: u64) -> io::Result<()>
    where
        Self: Seek,
    {
        let start = self.stream_position()?;
        let target = start
            .checked_add(count)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "skip too large"))?;

        let end = self.seek(SeekFrom::End(0))?;
        if target > end {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "needed {} bytes but only {} available",
                    count,
                    end.saturating_sub(start)
                ),
            ));
        }

        self.seek(SeekFrom::Start(target))?;
        Ok(())
    }

    /// Read a type tag, or `None` when the stream is exactly at its end.
    ///
    /// Fewer than four remaining bytes is an `UnexpectedEof` error.
    fn try_read_tag(&mut self) -> io::Result<Option<Tag>> {
        let mut bytes = [0u8; 4];
        let mut filled = 0;
        while filled < bytes.len() {
            match self.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        match filled {
            0 => Ok(None),
            4 => Ok(Some(Tag(bytes))),
            _ => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated tag: only {} of 4 bytes available", filled),
            )),
        }
    }
}

impl<R: Read + ?Sized> ReadExt for R {}

/// A byte range of a stream that starts at a known position.
///
/// Used to bound loops by bytes consumed rather than by element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRegion {
    start: u64,
    len: u64,
}

impl StreamRegion {
    /// Begin a region of `len` bytes at the stream's current position.
    pub fn begin<S: Seek + ?Sized>(stream: &mut S, len: u64) -> io::Result<Self> {
        Ok(Self {
            start: stream.stream_position()?,
            len,
        })
    }

    /// Absolute offset of the first byte of the region.
    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Declared length of the region.
    #[inline]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Check if the region was declared empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Absolute offset one past the declared end.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.start.saturating_add(self.len)
    }

    /// Bytes consumed since the start of the region.
    pub fn consumed<S: Seek + ?Sized>(&self, stream: &mut S) -> io::Result<u64> {
        Ok(stream.stream_position()?.saturating_sub(self.start))
    }

    /// Check whether at least the declared number of bytes has been consumed.
    pub fn is_exhausted<S: Seek + ?Sized>(&self, stream: &mut S) -> io::Result<bool> {
        Ok(self.consumed(stream)? >= self.len)
    }
}
