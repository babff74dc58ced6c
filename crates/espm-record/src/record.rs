//! Record decoding.

use std::io::{Cursor, Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};
use espm_common::{ReadExt, StreamRegion, Tag};

use crate::decompress;
use crate::game::TAG_LEN;
use crate::{GameId, Result, Subrecord};

/// The fixed fields of a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordHeader {
    /// Byte length of the subrecord payload following the header.
    pub payload_size: u32,
    /// Opaque record flags.
    pub flags: u32,
    /// Cross-reference identifier (FormID); zero for Morrowind.
    pub identifier: u32,
}

impl RecordHeader {
    /// Decode a record header, leaving the reader at the start of the payload.
    ///
    /// The type tag is consumed but not kept; callers that need it read it
    /// themselves and call [`RecordHeader::read_after_tag`].
    pub fn read<R: Read + ?Sized>(reader: &mut R, game: GameId) -> Result<Self> {
        reader.discard_bytes(TAG_LEN)?;
        Self::read_after_tag(reader, game)
    }

    /// Decode the header fields that follow an already consumed type tag.
    pub fn read_after_tag<R: Read + ?Sized>(reader: &mut R, game: GameId) -> Result<Self> {
        let layout = game.header_layout();

        let payload_size = reader.read_u32::<LittleEndian>()?;

        if layout.has_unknown_padding {
            reader.discard_bytes(4)?;
        }

        let flags = reader.read_u32::<LittleEndian>()?;

        let mut identifier = 0;
        if layout.has_identifier {
            identifier = reader.read_u32::<LittleEndian>()?;
            reader.discard_bytes(u64::from(layout.trailing_pad_bytes))?;
        }

        Ok(Self {
            payload_size,
            flags,
            identifier,
        })
    }
}

/// Options controlling how a record payload is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Seek past the payload instead of decoding subrecords.
    pub skip_subrecords: bool,
    /// Inflate payloads whose flags mark them as compressed before decoding.
    pub inflate_compressed: bool,
}

impl ReadOptions {
    /// Options that skip every payload.
    pub const fn skip() -> Self {
        Self {
            skip_subrecords: true,
            inflate_compressed: false,
        }
    }

    /// Options that decode payloads exactly as stored, compressed or not.
    pub const fn raw() -> Self {
        Self {
            skip_subrecords: false,
            inflate_compressed: false,
        }
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            skip_subrecords: false,
            inflate_compressed: true,
        }
    }
}

/// A decoded record.
///
/// Records are produced by a single read and never change afterwards.
/// Subrecords are kept in on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    header: RecordHeader,
    subrecords: Vec<Subrecord>,
}

impl Record {
    /// Decode one record at the reader's current position.
    ///
    /// With `skip_subrecords` the payload is seeked over and the record has no
    /// subrecords. Otherwise subrecords are decoded until at least the
    /// declared payload size has been consumed. Compressed payloads are not
    /// inflated; use [`Record::read_with`] for that.
    ///
    /// # Example
    ///
    /// ```
    /// use std::io::Cursor;
    /// use espm_record::{GameId, Record};
    ///
    /// let mut data = b"TES4".to_vec();
    /// data.extend(0u32.to_le_bytes()); // payload size
    /// data.extend(1u32.to_le_bytes()); // flags
    /// data.extend(42u32.to_le_bytes()); // identifier
    /// data.extend([0u8; 4]); // trailing pad
    ///
    /// let mut cursor = Cursor::new(data);
    /// let record = Record::read(&mut cursor, GameId::Oblivion, false)?;
    ///
    /// assert_eq!(record.flags(), 1);
    /// assert_eq!(record.identifier(), 42);
    /// assert!(record.subrecords().is_empty());
    /// assert_eq!(cursor.position(), 20);
    /// # Ok::<(), espm_record::Error>(())
    /// ```
    pub fn read<R: Read + Seek + ?Sized>(
        reader: &mut R,
        game: GameId,
        skip_subrecords: bool,
    ) -> Result<Self> {
        let options = ReadOptions {
            skip_subrecords,
            inflate_compressed: false,
        };
        Self::read_with(reader, game, &options)
    }

    /// Decode one record with explicit options.
    ///
    /// Whatever the options, the reader ends at least `payload_size` bytes
    /// past the start of the payload. It only ends further when the last
    /// subrecord overruns the declared size. A payload cut short by the end
    /// of the stream is an error, skipped or not.
    pub fn read_with<R: Read + Seek + ?Sized>(
        reader: &mut R,
        game: GameId,
        options: &ReadOptions,
    ) -> Result<Self> {
        reader.discard_bytes(TAG_LEN)?;
        Self::read_after_tag(reader, game, options)
    }

    /// Decode a record whose type tag has already been consumed.
    ///
    /// Used by callers that read the tag themselves to dispatch on it.
    pub fn read_after_tag<R: Read + Seek + ?Sized>(
        reader: &mut R,
        game: GameId,
        options: &ReadOptions,
    ) -> Result<Self> {
        let header = RecordHeader::read_after_tag(reader, game)?;
        let payload_size = u64::from(header.payload_size);

        let subrecords = if options.skip_subrecords {
            reader.skip_bytes(payload_size)?;
            Vec::new()
        } else if options.inflate_compressed && game.header_layout().is_compressed(header.flags) {
            let payload = reader.read_vec(payload_size)?;
            let inflated = decompress::inflate_payload(&payload)?;
            let inflated_len = inflated.len() as u64;
            read_subrecords(&mut Cursor::new(inflated), game, inflated_len)?
        } else {
            read_subrecords(reader, game, payload_size)?
        };

        Ok(Self { header, subrecords })
    }

    /// Get the header fields.
    #[inline]
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Get the record flags.
    #[inline]
    pub fn flags(&self) -> u32 {
        self.header.flags
    }

    /// Get the record identifier (zero for Morrowind).
    #[inline]
    pub fn identifier(&self) -> u32 {
        self.header.identifier
    }

    /// Get the declared payload size.
    #[inline]
    pub fn payload_size(&self) -> u32 {
        self.header.payload_size
    }

    /// Get the subrecords in on-disk order.
    #[inline]
    pub fn subrecords(&self) -> &[Subrecord] {
        &self.subrecords
    }

    /// Consume the record, returning its subrecords.
    #[inline]
    pub fn into_subrecords(self) -> Vec<Subrecord> {
        self.subrecords
    }

    /// Find the first subrecord with the given tag.
    pub fn subrecord(&self, tag: Tag) -> Option<&Subrecord> {
        self.subrecords.iter().find(|s| s.tag() == tag)
    }
}

/// Decode subrecords until at least `payload_size` bytes have been consumed.
///
/// The bound is checked before each subrecord, so the last one may run past
/// the declared size and is still kept.
fn read_subrecords<R: Read + Seek + ?Sized>(
    reader: &mut R,
    game: GameId,
    payload_size: u64,
) -> Result<Vec<Subrecord>> {
    let region = StreamRegion::begin(reader, payload_size)?;

    let mut subrecords = Vec::new();
    while !region.is_exhausted(reader)? {
        subrecords.push(Subrecord::read(reader, game)?);
    }

    Ok(subrecords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::COMPRESSED_FLAG;
    use crate::Error;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn header_bytes(game: GameId, tag: &[u8; 4], size: u32, flags: u32, identifier: u32) -> Vec<u8> {
        let layout = game.header_layout();

        let mut out = tag.to_vec();
        out.extend(size.to_le_bytes());
        if layout.has_unknown_padding {
            out.extend([0xaa; 4]);
        }
        out.extend(flags.to_le_bytes());
        if layout.has_identifier {
            out.extend(identifier.to_le_bytes());
            out.extend(vec![0xbb; layout.trailing_pad_bytes as usize]);
        }
        out
    }

    fn subrecord_bytes(game: GameId, tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        match game {
            GameId::Morrowind => out.extend((data.len() as u32).to_le_bytes()),
            _ => out.extend((data.len() as u16).to_le_bytes()),
        }
        out.extend_from_slice(data);
        out
    }

    fn sample_payload(game: GameId) -> Vec<u8> {
        let mut payload = subrecord_bytes(game, b"EDID", b"IronSword\0");
        payload.extend(subrecord_bytes(game, b"DATA", &[1, 2, 3, 4, 5, 6, 7, 8]));
        payload.extend(subrecord_bytes(game, b"FULL", b""));
        payload
    }

    #[test]
    fn test_file_header_record() {
        let mut data = header_bytes(GameId::Oblivion, b"TES4", 0, 0x0000_0001, 0x0000_002a);
        data.extend(b"NEXT");
        let mut cursor = Cursor::new(data);

        let record = Record::read(&mut cursor, GameId::Oblivion, false).unwrap();
        assert_eq!(record.flags(), 1);
        assert_eq!(record.identifier(), 42);
        assert_eq!(record.subrecords().len(), 0);
        assert_eq!(cursor.position(), 20);
    }

    #[test]
    fn test_header_consumption_per_game() {
        for game in GameId::ALL {
            let mut data = header_bytes(game, b"WEAP", 0, 0, 7);
            data.extend([0u8; 16]);
            let mut cursor = Cursor::new(data);

            RecordHeader::read(&mut cursor, game).unwrap();
            let after_tag = cursor.position() - TAG_LEN;
            let expected = match game {
                GameId::Morrowind => 12,
                GameId::Oblivion => 16,
                _ => 20,
            };
            assert_eq!(after_tag, expected, "{}", game);
        }
    }

    #[test]
    fn test_same_bytes_different_game() {
        let data: Vec<u8> = (0u8..64).collect();

        let mut tes3 = Cursor::new(&data[..]);
        let morrowind = RecordHeader::read(&mut tes3, GameId::Morrowind).unwrap();

        let mut tes4 = Cursor::new(&data[..]);
        let oblivion = RecordHeader::read(&mut tes4, GameId::Oblivion).unwrap();

        let mut tes5 = Cursor::new(&data[..]);
        RecordHeader::read(&mut tes5, GameId::Skyrim).unwrap();

        assert_eq!(morrowind.identifier, 0);
        assert_eq!(morrowind.payload_size, oblivion.payload_size);
        assert_ne!(morrowind.flags, oblivion.flags);
        assert_ne!(tes3.position(), tes4.position());
        assert_ne!(tes4.position(), tes5.position());
    }

    #[test]
    fn test_morrowind_identifier_zero() {
        let mut data = header_bytes(GameId::Morrowind, b"TES3", 0, 0xffff_ffff, 0);
        data.extend([0xff; 8]);
        let mut cursor = Cursor::new(data);

        let record = Record::read(&mut cursor, GameId::Morrowind, false).unwrap();
        assert_eq!(record.identifier(), 0);
        assert_eq!(record.flags(), 0xffff_ffff);
        assert_eq!(cursor.position(), 16);
    }

    #[test]
    fn test_skip_advances_exactly() {
        for game in GameId::ALL {
            // Payload that would not decode as subrecords.
            let payload = vec![0xffu8; 37];
            let mut data = header_bytes(game, b"NPC_", payload.len() as u32, 0, 1);
            let payload_start = data.len() as u64;
            data.extend(&payload);
            data.extend(b"NEXT");
            let mut cursor = Cursor::new(data);

            let record = Record::read(&mut cursor, game, true).unwrap();
            assert!(record.subrecords().is_empty());
            assert_eq!(record.payload_size(), 37);
            assert_eq!(cursor.position(), payload_start + 37, "{}", game);
        }
    }

    #[test]
    fn test_decode_consumes_payload() {
        for game in GameId::ALL {
            let payload = sample_payload(game);
            let mut data = header_bytes(game, b"WEAP", payload.len() as u32, 0, 0x0001_0203);
            let payload_start = data.len() as u64;
            data.extend(&payload);
            data.extend(b"NEXT");
            let mut cursor = Cursor::new(data);

            let record = Record::read(&mut cursor, game, false).unwrap();
            let tags: Vec<String> = record.subrecords().iter().map(|s| s.tag().to_string()).collect();
            assert_eq!(tags, ["EDID", "DATA", "FULL"], "{}", game);
            assert_eq!(record.subrecords()[0].data(), b"IronSword\0");
            assert!(record.subrecords()[2].is_empty());
            assert_eq!(cursor.position(), payload_start + payload.len() as u64);
            assert_eq!(record.subrecord(Tag(*b"DATA")).map(|s| s.len()), Some(8));
        }
    }

    #[test]
    fn test_subrecord_overrun_is_kept() {
        let game = GameId::Oblivion;
        // 6-byte header + 8 bytes of data = 14 bytes against a declared 12.
        let sub = subrecord_bytes(game, b"DATA", &[9; 8]);
        assert_eq!(sub.len(), 14);

        let mut data = header_bytes(game, b"MISC", 12, 0, 5);
        let payload_start = data.len() as u64;
        data.extend(&sub);
        data.extend(subrecord_bytes(game, b"NEXT", b"x"));
        let mut cursor = Cursor::new(data);

        let record = Record::read(&mut cursor, game, false).unwrap();
        assert_eq!(record.subrecords().len(), 1);
        assert_eq!(cursor.position(), payload_start + 14);
    }

    #[test]
    fn test_short_fixed_field_fails() {
        let mut data = b"TES4".to_vec();
        data.extend(0u32.to_le_bytes());
        data.extend([0x01, 0x00]); // flags cut 2 bytes short
        let mut cursor = Cursor::new(data);

        let err = Record::read(&mut cursor, GameId::Skyrim, false).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_short_trailing_pad_fails() {
        let mut data = header_bytes(GameId::Skyrim, b"TES4", 0, 0, 0);
        data.truncate(data.len() - 2);
        let mut cursor = Cursor::new(data);

        assert!(Record::read(&mut cursor, GameId::Skyrim, true).is_err());
    }

    #[test]
    fn test_truncated_payload_fails() {
        let game = GameId::Skyrim;
        let payload = sample_payload(game);
        let mut data = header_bytes(game, b"WEAP", payload.len() as u32, 0, 0);
        data.extend(&payload[..payload.len() - 3]);
        let mut cursor = Cursor::new(data);

        let err = Record::read(&mut cursor, game, false).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_skip_truncated_payload_fails() {
        let game = GameId::Skyrim;
        let mut data = header_bytes(game, b"WEAP", 1000, 0, 0);
        data.extend([0u8; 10]);
        let mut cursor = Cursor::new(data);

        let err = Record::read(&mut cursor, game, true).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_large_subrecord_in_payload() {
        let game = GameId::SkyrimSE;
        let large = vec![0x5au8; 70_000];

        let mut payload = b"XXXX\x04\x00".to_vec();
        payload.extend((large.len() as u32).to_le_bytes());
        payload.extend(b"OFST\x00\x00");
        payload.extend(&large);
        payload.extend(subrecord_bytes(game, b"EDID", b"Cell\0"));

        let mut data = header_bytes(game, b"WRLD", payload.len() as u32, 0, 0x3c);
        let end = (data.len() + payload.len()) as u64;
        data.extend(&payload);
        data.extend(b"NEXT");
        let mut cursor = Cursor::new(data);

        let record = Record::read(&mut cursor, game, false).unwrap();
        assert_eq!(record.subrecords().len(), 2);
        assert_eq!(record.subrecords()[0].tag(), Tag(*b"OFST"));
        assert_eq!(record.subrecords()[0].len(), 70_000);
        assert_eq!(record.subrecords()[1].data(), b"Cell\0");
        assert_eq!(cursor.position(), end);
    }

    #[test]
    fn test_read_after_tag() {
        let game = GameId::Oblivion;
        let payload = sample_payload(game);
        let mut data = header_bytes(game, b"WEAP", payload.len() as u32, 0, 7);
        data.extend(&payload);
        let mut cursor = Cursor::new(data);

        assert_eq!(cursor.read_tag().unwrap(), Tag(*b"WEAP"));
        let record = Record::read_after_tag(&mut cursor, game, &ReadOptions::raw()).unwrap();
        assert_eq!(record.identifier(), 7);
        assert_eq!(record.subrecords().len(), 3);
    }

    fn compressed_record(game: GameId) -> (Vec<u8>, u64) {
        let inner = sample_payload(game);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&inner).unwrap();

        let mut payload = (inner.len() as u32).to_le_bytes().to_vec();
        payload.extend(encoder.finish().unwrap());

        let mut data = header_bytes(game, b"NPC_", payload.len() as u32, COMPRESSED_FLAG, 9);
        let end = (data.len() + payload.len()) as u64;
        data.extend(payload);
        data.extend(b"NEXT");
        (data, end)
    }

    #[test]
    fn test_compressed_record_inflated() {
        let game = GameId::SkyrimSE;
        let (data, end) = compressed_record(game);
        let mut cursor = Cursor::new(data);

        let record = Record::read_with(&mut cursor, game, &ReadOptions::default()).unwrap();
        assert_eq!(record.flags(), COMPRESSED_FLAG);
        assert_eq!(record.subrecords().len(), 3);
        assert_eq!(record.subrecords()[0].data(), b"IronSword\0");
        assert_eq!(cursor.position(), end);
    }

    #[test]
    fn test_compressed_matches_uncompressed() {
        let game = GameId::Fallout3;
        let (compressed, _) = compressed_record(game);
        let payload = sample_payload(game);
        let mut plain = header_bytes(game, b"NPC_", payload.len() as u32, 0, 9);
        plain.extend(&payload);

        let options = ReadOptions::default();
        let inflated = Record::read_with(&mut Cursor::new(compressed), game, &options).unwrap();
        let stored = Record::read_with(&mut Cursor::new(plain), game, &options).unwrap();

        assert_eq!(inflated.subrecords(), stored.subrecords());
        assert_eq!(inflated.identifier(), stored.identifier());
    }

    #[test]
    fn test_compressed_record_skipped() {
        let game = GameId::Fallout4;
        let (data, end) = compressed_record(game);
        let mut cursor = Cursor::new(data);

        let record = Record::read_with(&mut cursor, game, &ReadOptions::skip()).unwrap();
        assert!(record.subrecords().is_empty());
        assert_eq!(cursor.position(), end);
    }

    #[test]
    fn test_compressed_record_bad_stream() {
        let game = GameId::Skyrim;
        let mut data = header_bytes(game, b"NPC_", 8, COMPRESSED_FLAG, 0);
        data.extend(16u32.to_le_bytes());
        data.extend([0x00, 0x01, 0x02, 0x03]);
        let mut cursor = Cursor::new(data);

        let err = Record::read_with(&mut cursor, game, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Decompression(_)));
    }

    #[test]
    fn test_morrowind_ignores_compressed_flag() {
        let game = GameId::Morrowind;
        // The same bit means nothing to Morrowind, so the payload decodes as-is.
        let payload = sample_payload(game);
        let mut data = header_bytes(game, b"CELL", payload.len() as u32, COMPRESSED_FLAG, 0);
        data.extend(&payload);
        let mut cursor = Cursor::new(data);

        let record = Record::read_with(&mut cursor, game, &ReadOptions::default()).unwrap();
        assert_eq!(record.subrecords().len(), 3);
        assert!(!ReadOptions::raw().inflate_compressed);
    }
}
