// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for PNG chunk parsing, scanline reconstruction and encoding.

use std::fmt;

/// Errors that can occur while reading, reconstructing or writing PNG data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PngError {
    /// Missing or wrong 8-byte PNG signature.
    InvalidSignature,
    /// A chunk's length, type, data or CRC runs past the end of input.
    TruncatedChunk { offset: usize },
    /// The first chunk is not IHDR.
    MissingHeader,
    /// IHDR data has the wrong length or inconsistent fields.
    InvalidHeader(&'static str),
    /// Color type is not one of 0, 2, 3, 4, 6.
    UnsupportedColorMode(u8),
    /// Interlaced (Adam7) images cannot be reconstructed row by row.
    UnsupportedInterlace(u8),
    /// Scanline filter byte outside 0–4.
    UnknownFilterSelector(u8),
    /// Decompressed image data does not hold the expected scanlines.
    ScanlineSizeMismatch { expected: usize, actual: usize },
    /// zlib inflate/deflate failed.
    Compression(String),
    /// A PLTE chunk appeared in a grayscale image.
    UnexpectedPalette(u8),
    /// An ancillary chunk could not be decoded.
    InvalidMetadata(&'static str),
}

impl fmt::Display for PngError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "missing PNG signature (not a PNG)"),
            Self::TruncatedChunk { offset } => write!(f, "truncated chunk at byte offset {offset}"),
            Self::MissingHeader => write!(f, "first chunk is not IHDR"),
            Self::InvalidHeader(msg) => write!(f, "invalid IHDR: {msg}"),
            Self::UnsupportedColorMode(c) => write!(f, "unsupported color type: {c}"),
            Self::UnsupportedInterlace(m) => write!(f, "unsupported interlace method: {m}"),
            Self::UnknownFilterSelector(s) => write!(f, "unknown scanline filter type: {s}"),
            Self::ScanlineSizeMismatch { expected, actual } => {
                write!(f, "image data size mismatch: expected {expected} bytes, got {actual}")
            }
            Self::Compression(msg) => write!(f, "zlib error: {msg}"),
            Self::UnexpectedPalette(c) => write!(f, "PLTE chunk not allowed for color type {c}"),
            Self::InvalidMetadata(msg) => write!(f, "invalid metadata chunk: {msg}"),
        }
    }
}

impl std::error::Error for PngError {}

pub type Result<T> = std::result::Result<T, PngError>;
