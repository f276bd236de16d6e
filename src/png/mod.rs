// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! PNG chunk codec with scanline reconstruction.
//!
//! Reads a PNG into its ordered list of chunks and writes it back with
//! recomputed CRCs. Unmodified chunks survive a round trip byte for byte.
//! For pixel-level work the IDAT stream can be inflated and unfiltered into
//! raw scanline bytes, and raw bytes filtered and deflated again.
//!
//! Supports:
//! - All five color types at every bit depth the format allows
//! - IDAT streams split across any number of chunks
//! - Metadata decoding for tEXt, zTXt, iTXt, tIME, pHYs
//! - Stripping of ancillary chunks
//!
//! Does NOT support:
//! - Adam7 interlacing for pixel reconstruction (chunk-level work is fine)
//! - CRC verification on read

pub mod error;
pub mod chunk;
pub mod header;
pub mod filter;
pub mod zlib;
pub mod metadata;

use chunk::{decode_chunks, encode_chunks, Chunk, ChunkKind, ChunkTag};
use error::{PngError, Result};
use filter::{filter_scanlines, unfilter_scanlines, FilterStrategy};
use header::{ColorType, ImageHeader};

/// A decoded PNG file: its chunks in stream order.
///
/// Created with [`PngFile::from_bytes`]; written back with
/// [`PngFile::to_bytes`], which recomputes every CRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngFile {
    chunks: Vec<Chunk>,
}

impl PngFile {
    /// Parse a PNG byte stream into chunks.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self { chunks: decode_chunks(data)? })
    }

    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// Build a single-IDAT PNG from raw scanline bytes.
    pub fn encode_image(header: &ImageHeader, raw: &[u8], strategy: FilterStrategy) -> Result<Self> {
        let idat = encode_pixels(header, raw, strategy)?;
        Ok(Self {
            chunks: vec![
                Chunk::new(ChunkTag::IHDR, header.to_bytes().to_vec()),
                Chunk::new(ChunkTag::IDAT, idat),
                Chunk::new(ChunkTag::IEND, Vec::new()),
            ],
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_chunks(&self.chunks)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    /// The IHDR fields. Fails unless the first chunk is a valid IHDR.
    pub fn header(&self) -> Result<ImageHeader> {
        header_of(&self.chunks)
    }

    /// All IDAT payloads concatenated (one zlib stream).
    pub fn image_data(&self) -> Vec<u8> {
        concat_image_data(&self.chunks)
    }

    /// Inflate and unfilter the image into raw scanline bytes
    /// (`height * stride` bytes, no filter-type bytes).
    pub fn decode_pixels(&self) -> Result<Vec<u8>> {
        let header = self.header()?;
        decode_pixels(&header, &self.image_data())
    }

    /// Copy of this file with all ancillary chunks removed.
    pub fn strip_ancillary(&self) -> Result<Self> {
        Ok(Self { chunks: strip_ancillary(&self.chunks)? })
    }
}

/// Parse IHDR from the first chunk.
pub fn header_of(chunks: &[Chunk]) -> Result<ImageHeader> {
    let first = chunks.first().ok_or(PngError::MissingHeader)?;
    ImageHeader::from_chunk(first)
}

/// Concatenate the data of every IDAT chunk in order.
pub fn concat_image_data(chunks: &[Chunk]) -> Vec<u8> {
    let total = chunks.iter().filter(|c| c.kind() == ChunkKind::PixelData).map(Chunk::len).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in chunks.iter().filter(|c| c.kind() == ChunkKind::PixelData) {
        out.extend_from_slice(&chunk.data);
    }
    out
}

fn require_progressive_rows(header: &ImageHeader) -> Result<()> {
    if header.is_interlaced() {
        return Err(PngError::UnsupportedInterlace(header.interlace_method));
    }
    Ok(())
}

/// Inflate a zlib IDAT stream and reconstruct `header.height` raw rows.
pub fn decode_pixels(header: &ImageHeader, idat_stream: &[u8]) -> Result<Vec<u8>> {
    require_progressive_rows(header)?;
    let filtered = zlib::decompress(idat_stream)?;
    unfilter_scanlines(&filtered, header.stride(), header.bytes_per_pixel(), header.height as usize)
}

/// Filter raw rows (any whole number of `stride`-byte rows) and deflate.
pub fn encode_pixels(header: &ImageHeader, raw: &[u8], strategy: FilterStrategy) -> Result<Vec<u8>> {
    require_progressive_rows(header)?;
    let stride = header.stride();
    if raw.len() % stride != 0 {
        return Err(PngError::ScanlineSizeMismatch {
            expected: raw.len().div_ceil(stride) * stride,
            actual: raw.len(),
        });
    }
    let filtered = filter_scanlines(raw, stride, header.bytes_per_pixel(), strategy);
    zlib::compress(&filtered)
}

/// Keep only critical chunks.
///
/// PLTE is kept for indexed images, dropped for truecolor images (where it
/// is only a suggested palette) and rejected for grayscale images.
pub fn strip_ancillary(chunks: &[Chunk]) -> Result<Vec<Chunk>> {
    let mut color_type: Option<ColorType> = None;
    let mut kept = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        if chunk.tag == ChunkTag::IHDR {
            color_type = Some(ImageHeader::parse(&chunk.data)?.color_type);
        }

        let keep = if chunk.tag == ChunkTag::PLTE {
            match color_type {
                Some(ColorType::Indexed) => true,
                Some(ct @ (ColorType::Grayscale | ColorType::GrayscaleAlpha)) => {
                    return Err(PngError::UnexpectedPalette(ct as u8));
                }
                _ => false,
            }
        } else {
            chunk.tag.is_critical()
        };

        if keep {
            kept.push(chunk.clone());
        } else {
            tracing::debug!(tag = %chunk.tag, len = chunk.len(), "dropping ancillary chunk");
        }
    }

    Ok(kept)
}
