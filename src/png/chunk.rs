// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! PNG chunk reading and writing.
//!
//! Walks the length-prefixed chunks that follow the 8-byte signature,
//! keeping every chunk verbatim (including its stored CRC). Reading stops
//! after IEND or at end of input, whichever comes first. CRCs are not
//! verified on read; [`encode_chunks`] always recomputes them from the
//! chunk type and data.
//!
//! ```text
//! [4 bytes] data length (big-endian u32)
//! [4 bytes] chunk type (ASCII)
//! [N bytes] data
//! [4 bytes] CRC-32 of type ++ data (big-endian u32)
//! ```

use core::fmt;

use super::error::{PngError, Result};

/// The fixed 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Per-chunk overhead: length(4) + type(4) + crc(4).
pub const CHUNK_OVERHEAD: usize = 12;

/// A four-byte chunk type code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkTag(pub [u8; 4]);

impl ChunkTag {
    pub const IHDR: Self = Self(*b"IHDR");
    pub const PLTE: Self = Self(*b"PLTE");
    pub const IDAT: Self = Self(*b"IDAT");
    pub const IEND: Self = Self(*b"IEND");
    pub const TEXT: Self = Self(*b"tEXt");
    pub const ZTXT: Self = Self(*b"zTXt");
    pub const ITXT: Self = Self(*b"iTXt");
    pub const TIME: Self = Self(*b"tIME");
    pub const PHYS: Self = Self(*b"pHYs");
    pub const EXIF: Self = Self(*b"eXIf");

    /// Build a tag from a 4-character string. Returns `None` unless the
    /// string is exactly four ASCII letters.
    pub fn from_name(s: &str) -> Option<Self> {
        let bytes: [u8; 4] = s.as_bytes().try_into().ok()?;
        if bytes.iter().all(u8::is_ascii_alphabetic) {
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Structural role of this chunk type.
    pub fn kind(self) -> ChunkKind {
        match self {
            Self::IHDR => ChunkKind::Header,
            Self::IDAT => ChunkKind::PixelData,
            Self::IEND => ChunkKind::Terminator,
            _ => ChunkKind::Other,
        }
    }

    /// Uppercase first letter marks a critical (must-understand) chunk.
    /// Informational only; the codec never enforces it.
    pub fn is_critical(self) -> bool {
        self.0[0].is_ascii_uppercase()
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02X}")?;
            }
        }
        Ok(())
    }
}

/// Closed classification of chunk types by structural role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// IHDR: image dimensions and pixel format. Always first.
    Header,
    /// IDAT: zlib-compressed, filtered scanlines.
    PixelData,
    /// IEND: empty end-of-stream marker. Always last.
    Terminator,
    /// Everything else (palette, text, timestamps, private chunks...).
    Other,
}

/// A single chunk as read from (or to be written to) a PNG stream.
///
/// `crc` is whatever was stored in the input; it is not trusted when
/// writing. The declared length is always `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub tag: ChunkTag,
    pub data: Vec<u8>,
    pub crc: u32,
}

impl Chunk {
    /// Create a chunk with a freshly computed CRC.
    pub fn new(tag: ChunkTag, data: Vec<u8>) -> Self {
        let crc = chunk_crc(tag, &data);
        Self { tag, data, crc }
    }

    /// Declared data length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn kind(&self) -> ChunkKind {
        self.tag.kind()
    }

    /// Does the stored CRC match the chunk contents?
    pub fn crc_matches(&self) -> bool {
        self.crc == chunk_crc(self.tag, &self.data)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk {} ({} bytes)", self.tag, self.data.len())
    }
}

/// CRC-32/IEEE over `type ++ data`.
pub fn chunk_crc(tag: ChunkTag, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&tag.0);
    hasher.update(data);
    hasher.finalize()
}

/// Read all chunks from a PNG byte stream.
///
/// Fails with [`PngError::InvalidSignature`] if the signature is wrong and
/// [`PngError::TruncatedChunk`] if a chunk runs past the end of input.
/// Bytes after IEND are ignored.
pub fn decode_chunks(data: &[u8]) -> Result<Vec<Chunk>> {
    if data.len() < PNG_SIGNATURE.len() || data[..PNG_SIGNATURE.len()] != PNG_SIGNATURE {
        return Err(PngError::InvalidSignature);
    }

    let mut chunks = Vec::new();
    let mut pos = PNG_SIGNATURE.len();

    while pos < data.len() {
        let offset = pos;
        if pos + 8 > data.len() {
            return Err(PngError::TruncatedChunk { offset });
        }
        let length = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let tag = ChunkTag([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);
        pos += 8;

        let data_end = pos
            .checked_add(length)
            .filter(|&end| end.saturating_add(4) <= data.len())
            .ok_or(PngError::TruncatedChunk { offset })?;
        let body = data[pos..data_end].to_vec();
        let crc = u32::from_be_bytes([
            data[data_end],
            data[data_end + 1],
            data[data_end + 2],
            data[data_end + 3],
        ]);
        pos = data_end + 4;

        chunks.push(Chunk { tag, data: body, crc });

        if tag == ChunkTag::IEND {
            if pos < data.len() {
                tracing::warn!(trailing = data.len() - pos, "ignoring bytes after IEND");
            }
            break;
        }
    }

    Ok(chunks)
}

/// Serialize chunks into a complete PNG byte stream.
///
/// Writes the signature, then every chunk with its length and a CRC
/// recomputed from its type and data.
pub fn encode_chunks(chunks: &[Chunk]) -> Vec<u8> {
    let total: usize = chunks.iter().map(|c| c.data.len() + CHUNK_OVERHEAD).sum();
    let mut out = Vec::with_capacity(PNG_SIGNATURE.len() + total);
    out.extend_from_slice(&PNG_SIGNATURE);
    for chunk in chunks {
        write_chunk(&mut out, chunk.tag, &chunk.data);
    }
    out
}

fn write_chunk(out: &mut Vec<u8>, tag: ChunkTag, data: &[u8]) {
    debug_assert!(data.len() <= u32::MAX as usize, "chunk data exceeds u32 length field");
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&tag.0);
    out.extend_from_slice(data);
    out.extend_from_slice(&chunk_crc(tag, data).to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_png() -> Vec<u8> {
        let ihdr = [0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0];
        encode_chunks(&[
            Chunk::new(ChunkTag::IHDR, ihdr.to_vec()),
            Chunk::new(ChunkTag::IDAT, vec![1, 2, 3]),
            Chunk::new(ChunkTag::IEND, Vec::new()),
        ])
    }

    #[test]
    fn decode_minimal_png() {
        let bytes = minimal_png();
        let chunks = decode_chunks(&bytes).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].tag, ChunkTag::IHDR);
        assert_eq!(chunks[1].data, vec![1, 2, 3]);
        assert_eq!(chunks[2].tag, ChunkTag::IEND);
        assert!(chunks.iter().all(Chunk::crc_matches));
    }

    #[test]
    fn known_iend_crc() {
        // The IEND CRC is the same in every PNG file.
        assert_eq!(chunk_crc(ChunkTag::IEND, &[]), 0xAE42_6082);
    }

    #[test]
    fn invalid_signature() {
        assert_eq!(decode_chunks(b"GIF89a\0\0"), Err(PngError::InvalidSignature));
        assert_eq!(decode_chunks(&PNG_SIGNATURE[..5]), Err(PngError::InvalidSignature));
    }

    #[test]
    fn truncated_data_rejected() {
        let bytes = minimal_png();
        // Cut inside the IDAT data.
        let cut = 8 + 25 + 9;
        assert_eq!(
            decode_chunks(&bytes[..cut]),
            Err(PngError::TruncatedChunk { offset: 8 + 25 })
        );
    }

    #[test]
    fn oversized_length_rejected() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        bytes.extend_from_slice(b"IDAT");
        bytes.extend_from_slice(&[0; 8]);
        assert!(matches!(decode_chunks(&bytes), Err(PngError::TruncatedChunk { offset: 8 })));
    }

    #[test]
    fn partial_length_field_rejected() {
        let mut bytes = minimal_png();
        bytes.truncate(bytes.len() - 12);
        bytes.extend_from_slice(&[0, 0]);
        assert!(matches!(decode_chunks(&bytes), Err(PngError::TruncatedChunk { .. })));
    }

    #[test]
    fn stops_at_iend() {
        let mut bytes = minimal_png();
        bytes.extend_from_slice(b"garbage after the end");
        let chunks = decode_chunks(&bytes).unwrap();
        assert_eq!(chunks.last().unwrap().tag, ChunkTag::IEND);
    }

    #[test]
    fn end_of_input_without_iend() {
        let bytes = encode_chunks(&[Chunk::new(ChunkTag::IHDR, vec![0; 13])]);
        let chunks = decode_chunks(&bytes).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn corrupt_crc_accepted_and_rewritten() {
        let mut bytes = minimal_png();
        // Flip a bit in the IDAT CRC.
        let crc_pos = 8 + 25 + 8 + 3;
        bytes[crc_pos] ^= 0x01;
        let chunks = decode_chunks(&bytes).unwrap();
        assert!(!chunks[1].crc_matches());

        let rewritten = encode_chunks(&chunks);
        assert_eq!(rewritten, minimal_png());
    }

    #[test]
    fn criticality_from_case() {
        assert!(ChunkTag::IHDR.is_critical());
        assert!(ChunkTag::PLTE.is_critical());
        assert!(!ChunkTag::TEXT.is_critical());
        assert_eq!(ChunkTag::TEXT.kind(), ChunkKind::Other);
        assert_eq!(ChunkTag::IDAT.kind(), ChunkKind::PixelData);
    }

    #[test]
    fn tag_from_name() {
        assert_eq!(ChunkTag::from_name("tEXt"), Some(ChunkTag::TEXT));
        assert_eq!(ChunkTag::from_name("IDA"), None);
        assert_eq!(ChunkTag::from_name("ID4T"), None);
        assert_eq!(ChunkTag::TEXT.to_string(), "tEXt");
    }
}
