//! Decompression of compressed record payloads.
//!
//! A compressed payload is a u32 decompressed length followed by a zlib
//! stream that runs to the end of the payload.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::{Error, Result};

/// Inflate zlib data that should expand to exactly `expected_size` bytes.
///
/// At most one byte beyond `expected_size` is ever produced, so an oversized
/// stream is reported with `actual` of `expected_size + 1`.
pub fn inflate_zlib_sized(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected_size.min(data.len().saturating_mul(16)));
    let mut decoder = ZlibDecoder::new(data).take(expected_size as u64 + 1);

    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    if output.len() != expected_size {
        return Err(Error::SizeMismatch {
            expected: expected_size,
            actual: output.len(),
        });
    }

    Ok(output)
}

/// Split a compressed payload into its declared size and zlib stream, then inflate it.
pub fn inflate_payload(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() < 4 {
        return Err(Error::CompressedPayloadTooShort(payload.len() as u32));
    }
    let (size_bytes, stream) = payload.split_at(4);
    let expected_size =
        u32::from_le_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]]) as usize;
    inflate_zlib_sized(stream, expected_size)
}
