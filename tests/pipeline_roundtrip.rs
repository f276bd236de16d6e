// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! End-to-end encryption of PNG byte streams.

use pngcrypt::crypt::prime::MillerRabin;
use pngcrypt::png::chunk::{decode_chunks, encode_chunks};
use pngcrypt::{
    attach_seed, decrypt_chunks, decrypt_png, detach_seed, encrypt_chunks, encrypt_png, Chaining, ChainingSeed,
    Chunk, ChunkSelector, ChunkTag, ColorType, CryptError, FilterStrategy, Granularity, ImageHeader, KeyPair,
    PaddingPolicy, PngError, PngFile, TransformConfig,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::OnceLock;

fn key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(77);
        KeyPair::generate_with(128, &mut rng, &MillerRabin::default()).unwrap()
    })
}

fn header() -> ImageHeader {
    ImageHeader {
        width: 10,
        height: 6,
        bit_depth: 8,
        color_type: ColorType::Truecolor,
        compression_method: 0,
        filter_method: 0,
        interlace_method: 0,
    }
}

fn raw_pixels() -> Vec<u8> {
    (0..header().raw_len()).map(|i| (i * 31 % 256) as u8).collect()
}

fn sample_png() -> Vec<u8> {
    let h = header();
    let idat = pngcrypt::png::encode_pixels(&h, &raw_pixels(), FilterStrategy::Adaptive).unwrap();
    encode_chunks(&[
        Chunk::new(ChunkTag::IHDR, h.to_bytes().to_vec()),
        Chunk::new(ChunkTag::TEXT, b"Title\0Sunset over the bay".to_vec()),
        Chunk::new(ChunkTag::PHYS, vec![0, 0, 0x0B, 0x13, 0, 0, 0x0B, 0x13, 1]),
        Chunk::new(ChunkTag::IDAT, idat),
        Chunk::new(ChunkTag::IEND, Vec::new()),
    ])
}

fn pixels_of(bytes: &[u8]) -> Vec<u8> {
    PngFile::from_bytes(bytes).unwrap().decode_pixels().unwrap()
}

#[test]
fn default_config_encrypts_only_idat() {
    let original = sample_png();
    let config = TransformConfig::default();
    let sealed = encrypt_png(&original, &key().public_key(), &Chaining::Ecb, &config).unwrap();

    let before = decode_chunks(&original).unwrap();
    let after = decode_chunks(&sealed).unwrap();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.tag, a.tag);
        if b.tag == ChunkTag::IDAT {
            assert_ne!(b.data, a.data);
            assert!(a.crc_matches());
        } else {
            assert_eq!(b, a);
        }
    }

    let opened = decrypt_png(&sealed, &key().private_key(), &Chaining::Ecb, &config).unwrap();
    // Only the IDAT payload may differ (trailing block padding).
    assert_eq!(pixels_of(&opened), raw_pixels());
    let opened_chunks = decode_chunks(&opened).unwrap();
    assert_eq!(opened_chunks[1], before[1]);
    assert_eq!(opened_chunks[2], before[2]);
}

#[test]
fn cbc_with_embedded_seed() {
    let original = sample_png();
    let config = TransformConfig::default();
    let seed = ChainingSeed::for_layout(&key().layout().unwrap());
    let chaining = Chaining::Cbc(seed.clone());

    let chunks = decode_chunks(&original).unwrap();
    let sealed = encrypt_chunks(&chunks, &key().public_key(), &chaining, &config).unwrap();
    let file = encode_chunks(&attach_seed(&sealed, &seed));

    let (found, rest) = detach_seed(&decode_chunks(&file).unwrap());
    let found = found.unwrap();
    assert_eq!(found, seed);
    let opened = decrypt_chunks(&rest, &key().private_key(), &Chaining::Cbc(found), &config).unwrap();
    assert_eq!(pixels_of(&encode_chunks(&opened)), raw_pixels());
}

fn idat_of(bytes: &[u8]) -> Vec<u8> {
    PngFile::from_bytes(bytes).unwrap().image_data()
}

#[test]
fn wrong_mode_does_not_recover_pixels() {
    let original = sample_png();
    let config = TransformConfig::default();
    let chaining = Chaining::Cbc(ChainingSeed::from_bytes(vec![0x5A; 64]));
    let sealed = encrypt_png(&original, &key().public_key(), &chaining, &config).unwrap();

    // ECB undoes the exponentiation but not the chaining mask, so every
    // block still fits and decryption succeeds with the wrong bytes.
    let opened = decrypt_png(&sealed, &key().private_key(), &Chaining::Ecb, &config).unwrap();
    let (plain, garbled) = (idat_of(&original), idat_of(&opened));
    let payload = key().layout().unwrap().payload_size;
    assert_ne!(garbled[..plain.len()], plain[..]);
    let unmasked: Vec<u8> = garbled[..payload].iter().map(|b| b ^ 0x5A).collect();
    assert_eq!(unmasked, plain[..payload]);
}

#[test]
fn oversized_header_rejected_at_pixel_granularity() {
    let mut h = header();
    h.width = 0x7FFF_FFFF;
    h.height = 0x7FFF_FFFF;
    h.bit_depth = 16;
    h.color_type = ColorType::TruecolorAlpha;
    let png = encode_chunks(&[
        Chunk::new(ChunkTag::IHDR, h.to_bytes().to_vec()),
        Chunk::new(ChunkTag::IDAT, vec![0x78, 0x9C, 3, 0, 0, 0, 0, 1]),
        Chunk::new(ChunkTag::IEND, Vec::new()),
    ]);
    let config = TransformConfig::default().with_granularity(Granularity::Pixels);
    let too_large = Err(CryptError::Png(PngError::InvalidHeader("image too large")));
    assert_eq!(encrypt_png(&png, &key().public_key(), &Chaining::Ecb, &config), too_large);
    assert_eq!(decrypt_png(&png, &key().private_key(), &Chaining::Ecb, &config), too_large);
}

#[test]
fn all_chunks_roundtrip() {
    let original = sample_png();
    let config = TransformConfig::default()
        .with_selector(ChunkSelector::all_but_structural())
        .with_padding(PaddingPolicy::for_tags([ChunkTag::TEXT, ChunkTag::PHYS]));
    let sealed = encrypt_png(&original, &key().public_key(), &Chaining::Ecb, &config).unwrap();

    let after = decode_chunks(&sealed).unwrap();
    assert_eq!(after[0], decode_chunks(&original).unwrap()[0]);
    assert_eq!(after.last().unwrap().tag, ChunkTag::IEND);
    assert!(after[1..4].iter().all(|c| c.len() % 32 == 0));

    let opened = decrypt_png(&sealed, &key().private_key(), &Chaining::Ecb, &config).unwrap();
    let before = decode_chunks(&original).unwrap();
    let opened = decode_chunks(&opened).unwrap();
    assert_eq!(opened[1], before[1]);
    assert_eq!(opened[2], before[2]);
    assert_eq!(pixels_of(&encode_chunks(&opened)), raw_pixels());
}

#[test]
fn pixel_mode_output_is_viewable() {
    let original = sample_png();
    let config = TransformConfig::default().with_granularity(Granularity::Pixels);
    let sealed = encrypt_png(&original, &key().public_key(), &Chaining::Ecb, &config).unwrap();

    let viewable = PngFile::from_bytes(&sealed).unwrap();
    assert_eq!(viewable.header().unwrap(), header());
    let scrambled = viewable.decode_pixels().unwrap();
    assert_eq!(scrambled.len(), raw_pixels().len());
    assert_ne!(scrambled, raw_pixels());

    let opened = decrypt_png(&sealed, &key().private_key(), &Chaining::Ecb, &config).unwrap();
    assert_eq!(pixels_of(&opened), raw_pixels());
}

#[test]
fn interlaced_pixel_mode_rejected() {
    let mut h = header();
    h.interlace_method = 1;
    let png = encode_chunks(&[
        Chunk::new(ChunkTag::IHDR, h.to_bytes().to_vec()),
        Chunk::new(ChunkTag::IDAT, vec![0x78, 0x9C, 3, 0, 0, 0, 0, 1]),
        Chunk::new(ChunkTag::IEND, Vec::new()),
    ]);
    let config = TransformConfig::default().with_granularity(Granularity::Pixels);
    assert_eq!(
        encrypt_png(&png, &key().public_key(), &Chaining::Ecb, &config),
        Err(CryptError::Png(PngError::UnsupportedInterlace(1)))
    );
    // Record granularity does not care about interlacing.
    assert!(encrypt_png(&png, &key().public_key(), &Chaining::Ecb, &TransformConfig::default()).is_ok());
}

#[test]
fn non_png_input_rejected() {
    assert_eq!(
        encrypt_png(b"not a png", &key().public_key(), &Chaining::Ecb, &TransformConfig::default()),
        Err(CryptError::Png(PngError::InvalidSignature))
    );
}
