// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Decoders for ancillary metadata chunks.
//!
//! Fixed-layout decodes of tEXt, zTXt, iTXt, tIME and pHYs. eXIf is only
//! sized; interpreting EXIF tags is left to a dedicated EXIF library.

use core::fmt;

use super::chunk::{Chunk, ChunkTag};
use super::error::{PngError, Result};
use super::header::ImageHeader;
use super::zlib;

/// Keyword/text pair from tEXt or zTXt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub keyword: String,
    pub text: String,
}

/// iTXt contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternationalText {
    pub keyword: String,
    pub compressed: bool,
    pub language: String,
    pub translated_keyword: String,
    pub text: String,
}

/// tIME: last modification time (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalUnit {
    Unknown,
    Meter,
}

/// pHYs: intended pixel size or aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalDimensions {
    pub pixels_per_unit_x: u32,
    pub pixels_per_unit_y: u32,
    pub unit: PhysicalUnit,
}

/// One decoded metadata chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    Header(ImageHeader),
    Text(TextEntry),
    CompressedText(TextEntry),
    InternationalText(InternationalText),
    Timestamp(Timestamp),
    Physical(PhysicalDimensions),
    /// Raw EXIF block; only its length is reported.
    Exif { len: usize },
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header(h) => write!(
                f,
                "IHDR {}x{} depth={} color={:?} interlace={}",
                h.width, h.height, h.bit_depth, h.color_type, h.interlace_method
            ),
            Self::Text(t) => write!(f, "tEXt {}: {}", t.keyword, t.text),
            Self::CompressedText(t) => write!(f, "zTXt {}: {}", t.keyword, t.text),
            Self::InternationalText(t) => {
                write!(f, "iTXt {} [{}] {}: {}", t.keyword, t.language, t.translated_keyword, t.text)
            }
            Self::Timestamp(t) => write!(
                f,
                "tIME {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                t.year, t.month, t.day, t.hour, t.minute, t.second
            ),
            Self::Physical(p) => write!(
                f,
                "pHYs {}x{} per {:?}",
                p.pixels_per_unit_x, p.pixels_per_unit_y, p.unit
            ),
            Self::Exif { len } => write!(f, "eXIf ({len} bytes)"),
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn split_keyword(data: &[u8]) -> Result<(String, &[u8])> {
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or(PngError::InvalidMetadata("keyword is not null-terminated"))?;
    Ok((latin1(&data[..nul]), &data[nul + 1..]))
}

/// tEXt: `keyword NUL text`, both Latin-1.
pub fn parse_text(data: &[u8]) -> Result<TextEntry> {
    let (keyword, rest) = split_keyword(data)?;
    Ok(TextEntry { keyword, text: latin1(rest) })
}

/// zTXt: `keyword NUL method zlib(text)`.
pub fn parse_compressed_text(data: &[u8]) -> Result<TextEntry> {
    let (keyword, rest) = split_keyword(data)?;
    let (&method, compressed) = rest
        .split_first()
        .ok_or(PngError::InvalidMetadata("zTXt missing compression method"))?;
    if method != 0 {
        return Err(PngError::InvalidMetadata("unsupported zTXt compression method"));
    }
    let text = zlib::decompress(compressed)?;
    Ok(TextEntry { keyword, text: latin1(&text) })
}

/// iTXt: `keyword NUL flag method language NUL translated NUL text`.
pub fn parse_international_text(data: &[u8]) -> Result<InternationalText> {
    let (keyword, rest) = split_keyword(data)?;
    if rest.len() < 2 {
        return Err(PngError::InvalidMetadata("iTXt too short"));
    }
    let compressed = rest[0] == 1;
    let rest = &rest[2..];

    let nul = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(PngError::InvalidMetadata("iTXt language tag not terminated"))?;
    let language = latin1(&rest[..nul]);
    let rest = &rest[nul + 1..];

    let nul = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(PngError::InvalidMetadata("iTXt translated keyword not terminated"))?;
    let translated_keyword = String::from_utf8_lossy(&rest[..nul]).into_owned();
    let body = &rest[nul + 1..];

    let text = if compressed {
        let inflated = zlib::decompress(body)?;
        String::from_utf8(inflated).map_err(|_| PngError::InvalidMetadata("iTXt text is not UTF-8"))?
    } else {
        String::from_utf8(body.to_vec()).map_err(|_| PngError::InvalidMetadata("iTXt text is not UTF-8"))?
    };

    Ok(InternationalText { keyword, compressed, language, translated_keyword, text })
}

/// tIME: year(u16 BE), month, day, hour, minute, second.
pub fn parse_time(data: &[u8]) -> Result<Timestamp> {
    match data {
        [y0, y1, month, day, hour, minute, second] => Ok(Timestamp {
            year: u16::from_be_bytes([*y0, *y1]),
            month: *month,
            day: *day,
            hour: *hour,
            minute: *minute,
            second: *second,
        }),
        _ => Err(PngError::InvalidMetadata("tIME must be 7 bytes")),
    }
}

/// pHYs: x(u32 BE), y(u32 BE), unit specifier.
pub fn parse_physical(data: &[u8]) -> Result<PhysicalDimensions> {
    if data.len() != 9 {
        return Err(PngError::InvalidMetadata("pHYs must be 9 bytes"));
    }
    Ok(PhysicalDimensions {
        pixels_per_unit_x: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
        pixels_per_unit_y: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
        unit: if data[8] == 1 { PhysicalUnit::Meter } else { PhysicalUnit::Unknown },
    })
}

/// Decode a chunk if it is one of the known metadata types.
/// Returns `None` for chunks that carry no decodable metadata.
pub fn decode(chunk: &Chunk) -> Option<Result<Metadata>> {
    let decoded = match chunk.tag {
        ChunkTag::IHDR => ImageHeader::parse(&chunk.data).map(Metadata::Header),
        ChunkTag::TEXT => parse_text(&chunk.data).map(Metadata::Text),
        ChunkTag::ZTXT => parse_compressed_text(&chunk.data).map(Metadata::CompressedText),
        ChunkTag::ITXT => parse_international_text(&chunk.data).map(Metadata::InternationalText),
        ChunkTag::TIME => parse_time(&chunk.data).map(Metadata::Timestamp),
        ChunkTag::PHYS => parse_physical(&chunk.data).map(Metadata::Physical),
        ChunkTag::EXIF => Ok(Metadata::Exif { len: chunk.data.len() }),
        _ => return None,
    };
    Some(decoded)
}

/// Decode every metadata chunk, skipping (and logging) malformed ones.
pub fn describe(chunks: &[Chunk]) -> Vec<Metadata> {
    chunks
        .iter()
        .filter_map(|chunk| match decode(chunk)? {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(tag = %chunk.tag, error = %e, "skipping undecodable metadata chunk");
                None
            }
        })
        .collect()
}
