// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! IHDR parsing and scanline geometry.

use super::chunk::{Chunk, ChunkTag};
use super::error::{PngError, Result};

/// IHDR data is always 13 bytes.
pub const IHDR_LEN: usize = 13;

/// PNG color type (IHDR byte 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Grayscale = 0,
    Truecolor = 2,
    Indexed = 3,
    GrayscaleAlpha = 4,
    TruecolorAlpha = 6,
}

impl ColorType {
    /// Samples per pixel.
    pub const fn channels(self) -> usize {
        match self {
            Self::Grayscale | Self::Indexed => 1,
            Self::GrayscaleAlpha => 2,
            Self::Truecolor => 3,
            Self::TruecolorAlpha => 4,
        }
    }

    fn allows_bit_depth(self, depth: u8) -> bool {
        match self {
            Self::Grayscale => matches!(depth, 1 | 2 | 4 | 8 | 16),
            Self::Indexed => matches!(depth, 1 | 2 | 4 | 8),
            Self::Truecolor | Self::GrayscaleAlpha | Self::TruecolorAlpha => matches!(depth, 8 | 16),
        }
    }
}

impl TryFrom<u8> for ColorType {
    type Error = PngError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Grayscale),
            2 => Ok(Self::Truecolor),
            3 => Ok(Self::Indexed),
            4 => Ok(Self::GrayscaleAlpha),
            6 => Ok(Self::TruecolorAlpha),
            other => Err(PngError::UnsupportedColorMode(other)),
        }
    }
}

/// Decoded IHDR fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub compression_method: u8,
    pub filter_method: u8,
    pub interlace_method: u8,
}

impl ImageHeader {
    /// Parse the 13-byte IHDR payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != IHDR_LEN {
            return Err(PngError::InvalidHeader("IHDR must be 13 bytes"));
        }
        let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let bit_depth = data[8];
        let color_type = ColorType::try_from(data[9])?;

        if width == 0 || height == 0 {
            return Err(PngError::InvalidHeader("zero width or height"));
        }
        if !color_type.allows_bit_depth(bit_depth) {
            return Err(PngError::InvalidHeader("bit depth not allowed for color type"));
        }

        let header = Self {
            width,
            height,
            bit_depth,
            color_type,
            compression_method: data[10],
            filter_method: data[11],
            interlace_method: data[12],
        };
        header.filtered_len()?;
        Ok(header)
    }

    /// Parse the header from an IHDR chunk.
    pub fn from_chunk(chunk: &Chunk) -> Result<Self> {
        if chunk.tag != ChunkTag::IHDR {
            return Err(PngError::MissingHeader);
        }
        Self::parse(&chunk.data)
    }

    /// Serialize back to the 13-byte IHDR payload.
    pub fn to_bytes(&self) -> [u8; IHDR_LEN] {
        let mut out = [0u8; IHDR_LEN];
        out[0..4].copy_from_slice(&self.width.to_be_bytes());
        out[4..8].copy_from_slice(&self.height.to_be_bytes());
        out[8] = self.bit_depth;
        out[9] = self.color_type as u8;
        out[10] = self.compression_method;
        out[11] = self.filter_method;
        out[12] = self.interlace_method;
        out
    }

    pub fn bits_per_pixel(&self) -> usize {
        self.color_type.channels() * self.bit_depth as usize
    }

    /// Filter unit: bytes per complete pixel, rounded up, at least 1.
    pub fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel().div_ceil(8).max(1)
    }

    fn checked_stride(&self) -> Option<usize> {
        Some((self.width as usize).checked_mul(self.bits_per_pixel())?.div_ceil(8))
    }

    /// Bytes of pixel data per scanline, excluding the filter-type byte.
    /// Saturates for headers too large to address; [`parse`](Self::parse)
    /// rejects those.
    pub fn stride(&self) -> usize {
        self.checked_stride().unwrap_or(usize::MAX)
    }

    /// Length of the unfiltered image buffer (`height * stride`), saturating
    /// like [`stride`](Self::stride).
    pub fn raw_len(&self) -> usize {
        self.checked_stride()
            .and_then(|stride| stride.checked_mul(self.height as usize))
            .unwrap_or(usize::MAX)
    }

    /// Length of the decompressed IDAT stream: `height * (stride + 1)`.
    pub fn filtered_len(&self) -> Result<usize> {
        self.checked_stride()
            .and_then(|stride| stride.checked_add(1))
            .and_then(|row| row.checked_mul(self.height as usize))
            .ok_or(PngError::InvalidHeader("image too large"))
    }

    pub fn is_interlaced(&self) -> bool {
        self.interlace_method != 0
    }
}
