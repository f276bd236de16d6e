// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! zlib inflate/deflate for IDAT streams and compressed text chunks.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::error::{PngError, Result};

/// Deflate `data` into a zlib stream at the default compression level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 64), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PngError::Compression(e.to_string()))?;
    encoder.finish().map_err(|e| PngError::Compression(e.to_string()))
}

/// Inflate a zlib stream. Bytes after the end of the stream are ignored.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PngError::Compression(e.to_string()))?;
    Ok(out)
}
