// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! PNG codec tests on synthetic images: chunk-level byte fidelity, scanline
//! reconstruction across color types and bit depths, metadata, stripping.

use pngcrypt::png::chunk::{decode_chunks, encode_chunks, PNG_SIGNATURE};
use pngcrypt::png::metadata::{self, Metadata};
use pngcrypt::png::zlib;
use pngcrypt::{Chunk, ChunkTag, ColorType, FilterStrategy, FilterType, ImageHeader, PngError, PngFile};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn header(width: u32, height: u32, bit_depth: u8, color_type: ColorType) -> ImageHeader {
    ImageHeader {
        width,
        height,
        bit_depth,
        color_type,
        compression_method: 0,
        filter_method: 0,
        interlace_method: 0,
    }
}

fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut out = vec![0u8; len];
    rng.fill_bytes(&mut out);
    out
}

/// IHDR, tEXt, tIME, IDAT x2, zTXt, IEND.
fn decorated_png(h: &ImageHeader, raw: &[u8]) -> Vec<u8> {
    let idat = pngcrypt::png::encode_pixels(h, raw, FilterStrategy::Adaptive).unwrap();
    let (a, b) = idat.split_at(idat.len() / 3);
    let mut ztxt = b"Comment\0\0".to_vec();
    ztxt.extend(zlib::compress(b"generated for tests").unwrap());
    encode_chunks(&[
        Chunk::new(ChunkTag::IHDR, h.to_bytes().to_vec()),
        Chunk::new(ChunkTag::TEXT, b"Software\0pngcrypt".to_vec()),
        Chunk::new(ChunkTag::TIME, vec![0x07, 0xEA, 10, 16, 12, 30, 15]),
        Chunk::new(ChunkTag::IDAT, a.to_vec()),
        Chunk::new(ChunkTag::IDAT, b.to_vec()),
        Chunk::new(ChunkTag::ZTXT, ztxt),
        Chunk::new(ChunkTag::IEND, Vec::new()),
    ])
}

#[test]
fn bytes_survive_decode_encode() {
    let h = header(13, 9, 8, ColorType::Truecolor);
    let bytes = decorated_png(&h, &noise(h.raw_len(), 1));
    assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    let chunks = decode_chunks(&bytes).unwrap();
    assert_eq!(chunks.len(), 7);
    assert_eq!(encode_chunks(&chunks), bytes);
}

#[test]
fn pixels_reconstructed_for_every_format() {
    let formats = [
        (ColorType::Grayscale, vec![1u8, 2, 4, 8, 16]),
        (ColorType::Truecolor, vec![8, 16]),
        (ColorType::Indexed, vec![1, 2, 4, 8]),
        (ColorType::GrayscaleAlpha, vec![8, 16]),
        (ColorType::TruecolorAlpha, vec![8, 16]),
    ];
    for (seed, (color_type, depths)) in formats.iter().enumerate() {
        for &depth in depths {
            let h = header(11, 7, depth, *color_type);
            let raw = noise(h.raw_len(), seed as u64 * 100 + depth as u64);
            let png = PngFile::from_bytes(&decorated_png(&h, &raw)).unwrap();
            assert_eq!(png.decode_pixels().unwrap(), raw, "{color_type:?} at {depth} bits");
        }
    }
}

#[test]
fn fixed_filters_decode_identically() {
    let h = header(20, 12, 8, ColorType::TruecolorAlpha);
    let raw = noise(h.raw_len(), 7);
    for filter in FilterType::ALL {
        let png = PngFile::encode_image(&h, &raw, FilterStrategy::Fixed(filter)).unwrap();
        let reread = PngFile::from_bytes(&png.to_bytes()).unwrap();
        assert_eq!(reread.decode_pixels().unwrap(), raw, "{filter:?}");
    }
}

#[test]
fn unknown_filter_byte_rejected() {
    let h = header(2, 1, 8, ColorType::Grayscale);
    let idat = zlib::compress(&[9, 0, 0]).unwrap();
    let png = PngFile::from_chunks(vec![
        Chunk::new(ChunkTag::IHDR, h.to_bytes().to_vec()),
        Chunk::new(ChunkTag::IDAT, idat),
        Chunk::new(ChunkTag::IEND, Vec::new()),
    ]);
    assert_eq!(png.decode_pixels(), Err(PngError::UnknownFilterSelector(9)));
}

#[test]
fn short_image_data_rejected() {
    let h = header(4, 4, 8, ColorType::Grayscale);
    let idat = zlib::compress(&[0; 10]).unwrap();
    let png = PngFile::from_chunks(vec![
        Chunk::new(ChunkTag::IHDR, h.to_bytes().to_vec()),
        Chunk::new(ChunkTag::IDAT, idat),
    ]);
    assert!(matches!(png.decode_pixels(), Err(PngError::ScanlineSizeMismatch { .. })));
}

#[test]
fn oversized_header_is_an_error() {
    // 2^31-1 square RGBA16: stride * height does not fit in usize.
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&0x7FFF_FFFFu32.to_be_bytes());
    ihdr.extend_from_slice(&0x7FFF_FFFFu32.to_be_bytes());
    ihdr.extend_from_slice(&[16, 6, 0, 0, 0]);
    let bytes = encode_chunks(&[
        Chunk::new(ChunkTag::IHDR, ihdr),
        Chunk::new(ChunkTag::IDAT, vec![0x78, 0x9C, 3, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]),
        Chunk::new(ChunkTag::IEND, Vec::new()),
    ]);
    let png = PngFile::from_bytes(&bytes).unwrap();
    assert_eq!(png.decode_pixels(), Err(PngError::InvalidHeader("image too large")));
}

#[test]
fn metadata_listing() {
    let h = header(3, 3, 8, ColorType::Grayscale);
    let chunks = decode_chunks(&decorated_png(&h, &noise(h.raw_len(), 2))).unwrap();
    let meta = metadata::describe(&chunks);
    assert_eq!(meta.len(), 4);
    assert!(matches!(meta[0], Metadata::Header(ref parsed) if *parsed == h));
    assert_eq!(meta[1].to_string(), "tEXt Software: pngcrypt");
    assert_eq!(meta[2].to_string(), "tIME 2026-10-16 12:30:15");
    assert_eq!(meta[3].to_string(), "zTXt Comment: generated for tests");
}

#[test]
fn strip_leaves_decodable_image() {
    let h = header(8, 8, 8, ColorType::Truecolor);
    let raw = noise(h.raw_len(), 3);
    let png = PngFile::from_bytes(&decorated_png(&h, &raw)).unwrap();
    let stripped = png.strip_ancillary().unwrap();
    let tags: Vec<ChunkTag> = stripped.chunks().iter().map(|c| c.tag).collect();
    assert_eq!(tags, vec![ChunkTag::IHDR, ChunkTag::IDAT, ChunkTag::IDAT, ChunkTag::IEND]);
    assert_eq!(stripped.decode_pixels().unwrap(), raw);
}

#[test]
fn corrupt_crc_is_repaired_on_write() {
    let h = header(2, 2, 8, ColorType::Grayscale);
    let mut bytes = decorated_png(&h, &[1, 2, 3, 4]);
    let good = bytes.clone();
    // Last byte of the IEND CRC.
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let chunks = decode_chunks(&bytes).unwrap();
    assert!(!chunks.last().unwrap().crc_matches());
    assert_eq!(encode_chunks(&chunks), good);
}

#[test]
fn not_a_png() {
    assert_eq!(PngFile::from_bytes(b"GIF89a..."), Err(PngError::InvalidSignature));
    let h = header(2, 2, 8, ColorType::Grayscale);
    let bytes = decorated_png(&h, &[0; 4]);
    assert!(matches!(
        PngFile::from_bytes(&bytes[..bytes.len() - 6]),
        Err(PngError::TruncatedChunk { .. })
    ));
}
