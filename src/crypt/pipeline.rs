// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Chunk-level encryption and decryption of PNG files.
//!
//! Selected chunks have their data replaced by ciphertext (or plaintext) and
//! their CRC recomputed; every other chunk passes through unchanged and in
//! its original position. With [`Granularity::Pixels`] the image data is
//! handled as decoded scanlines instead, so the output is still a valid PNG
//! whose pixels are the ciphertext.

use crate::png;
use crate::png::chunk::{decode_chunks, encode_chunks, Chunk, ChunkKind, ChunkTag};
use crate::png::filter::{count_scanlines, unfilter_scanlines, FilterStrategy};
use crate::png::zlib;

use super::block::{self, BlockLayout, Chaining, ChainingSeed};
use super::error::{CryptError, Result};
use super::keys::{PrivateKey, PublicKey};

/// Private ancillary chunk carrying the CBC chaining seed.
pub const SEED_TAG: ChunkTag = ChunkTag(*b"cbIv");

/// Which chunks get transformed.
///
/// IHDR, IEND and the seed chunk are never selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSelector {
    tags: Vec<ChunkTag>,
    everything: bool,
}

impl ChunkSelector {
    /// IDAT only.
    pub fn pixel_data() -> Self {
        Self::tags([ChunkTag::IDAT])
    }

    pub fn tags(tags: impl IntoIterator<Item = ChunkTag>) -> Self {
        Self { tags: tags.into_iter().collect(), everything: false }
    }

    /// Every chunk except IHDR and IEND.
    pub fn all_but_structural() -> Self {
        Self { tags: Vec::new(), everything: true }
    }

    pub fn selects(&self, tag: ChunkTag) -> bool {
        match tag.kind() {
            ChunkKind::Header | ChunkKind::Terminator => false,
            _ if tag == SEED_TAG => false,
            _ => self.everything || self.tags.contains(&tag),
        }
    }
}

impl Default for ChunkSelector {
    fn default() -> Self {
        Self::pixel_data()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PaddingRule {
    Never,
    Always,
    Tags(Vec<ChunkTag>),
}

/// Which decrypted chunks get their trailing zero bytes removed.
///
/// Block padding is not self-describing, so stripping is only correct for
/// content that never ends in a zero byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingPolicy {
    rule: PaddingRule,
}

impl PaddingPolicy {
    /// tEXt and iTXt only.
    pub fn textual() -> Self {
        Self::for_tags([ChunkTag::TEXT, ChunkTag::ITXT])
    }

    pub fn never() -> Self {
        Self { rule: PaddingRule::Never }
    }

    pub fn always() -> Self {
        Self { rule: PaddingRule::Always }
    }

    pub fn for_tags(tags: impl IntoIterator<Item = ChunkTag>) -> Self {
        Self { rule: PaddingRule::Tags(tags.into_iter().collect()) }
    }

    pub fn strip_trailing_zero_padding(&self, tag: ChunkTag) -> bool {
        match &self.rule {
            PaddingRule::Never => false,
            PaddingRule::Always => true,
            PaddingRule::Tags(tags) => tags.contains(&tag),
        }
    }
}

impl Default for PaddingPolicy {
    fn default() -> Self {
        Self::textual()
    }
}

/// Unit of encryption for image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// Each selected chunk's data is one cipher stream.
    #[default]
    Record,
    /// The decoded scanlines of all IDAT chunks are one cipher stream and the
    /// result is re-encoded as a viewable image.
    Pixels,
}

/// Options for [`encrypt_chunks`] and [`decrypt_chunks`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformConfig {
    pub selector: ChunkSelector,
    pub padding: PaddingPolicy,
    pub granularity: Granularity,
    /// Filter used when re-encoding scanlines at pixel granularity.
    pub filter: FilterStrategy,
}

impl TransformConfig {
    pub fn with_selector(mut self, selector: ChunkSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_padding(mut self, padding: PaddingPolicy) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_filter(mut self, filter: FilterStrategy) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Clone, Copy)]
enum Direction<'k> {
    Encrypt(&'k PublicKey),
    Decrypt(&'k PrivateKey),
}

impl Direction<'_> {
    fn apply(&self, data: &[u8], chaining: &Chaining) -> Result<Vec<u8>> {
        match self {
            Self::Encrypt(key) => block::encrypt(data, key, chaining),
            Self::Decrypt(key) => block::decrypt(data, key, chaining),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Encrypt(_) => "encrypt",
            Self::Decrypt(_) => "decrypt",
        }
    }
}

/// Encrypt the selected chunks. Chunk order and count are preserved, except
/// that at pixel granularity all IDAT chunks collapse into one.
pub fn encrypt_chunks(
    chunks: &[Chunk],
    key: &PublicKey,
    chaining: &Chaining,
    config: &TransformConfig,
) -> Result<Vec<Chunk>> {
    transform(chunks, Direction::Encrypt(key), chaining, config)
}

/// Inverse of [`encrypt_chunks`] given the matching private key, chaining
/// mode and config.
pub fn decrypt_chunks(
    chunks: &[Chunk],
    key: &PrivateKey,
    chaining: &Chaining,
    config: &TransformConfig,
) -> Result<Vec<Chunk>> {
    transform(chunks, Direction::Decrypt(key), chaining, config)
}

/// Parse, encrypt and re-serialize a PNG byte stream.
pub fn encrypt_png(png: &[u8], key: &PublicKey, chaining: &Chaining, config: &TransformConfig) -> Result<Vec<u8>> {
    let chunks = decode_chunks(png)?;
    Ok(encode_chunks(&encrypt_chunks(&chunks, key, chaining, config)?))
}

/// Parse, decrypt and re-serialize a PNG byte stream.
pub fn decrypt_png(png: &[u8], key: &PrivateKey, chaining: &Chaining, config: &TransformConfig) -> Result<Vec<u8>> {
    let chunks = decode_chunks(png)?;
    Ok(encode_chunks(&decrypt_chunks(&chunks, key, chaining, config)?))
}

fn transform(chunks: &[Chunk], direction: Direction<'_>, chaining: &Chaining, config: &TransformConfig) -> Result<Vec<Chunk>> {
    let pixel_mode = config.granularity == Granularity::Pixels
        && config.selector.selects(ChunkTag::IDAT)
        && chunks.iter().any(|c| c.kind() == ChunkKind::PixelData);

    let mut pixel_stream = if pixel_mode {
        Some(transform_pixels(chunks, direction, chaining, config)?)
    } else {
        None
    };

    let mut out = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        if pixel_mode && chunk.kind() == ChunkKind::PixelData {
            // The whole stream goes where the first IDAT was.
            if let Some(data) = pixel_stream.take() {
                out.push(Chunk::new(ChunkTag::IDAT, data));
            }
            continue;
        }

        if !config.selector.selects(chunk.tag) {
            out.push(chunk.clone());
            continue;
        }

        let mut data = direction.apply(&chunk.data, chaining)?;
        if matches!(direction, Direction::Decrypt(_)) && config.padding.strip_trailing_zero_padding(chunk.tag) {
            block::strip_zero_padding(&mut data);
        }
        tracing::debug!(
            index,
            tag = %chunk.tag,
            len_in = chunk.len(),
            len_out = data.len(),
            op = direction.name(),
            "transformed chunk"
        );
        out.push(Chunk::new(chunk.tag, data));
    }
    Ok(out)
}

/// Encrypt or decrypt the decoded scanlines and return a new IDAT stream.
///
/// Ciphertext is longer than the image, so the encrypted stream carries
/// extra rows past `height`, the last one zero-filled. Decoders that follow
/// IHDR ignore them; decryption reads them back.
fn transform_pixels(chunks: &[Chunk], direction: Direction<'_>, chaining: &Chaining, config: &TransformConfig) -> Result<Vec<u8>> {
    let header = png::header_of(chunks)?;
    let stream = png::concat_image_data(chunks);
    let stride = header.stride();

    match direction {
        Direction::Encrypt(key) => {
            let raw = png::decode_pixels(&header, &stream)?;
            let mut sealed = block::encrypt(&raw, key, chaining)?;
            let rows = sealed.len().div_ceil(stride);
            sealed.resize(rows * stride, 0);
            tracing::debug!(raw = raw.len(), rows, height = header.height, "encrypted pixel stream");
            Ok(png::encode_pixels(&header, &sealed, config.filter)?)
        }
        Direction::Decrypt(key) => {
            if header.is_interlaced() {
                return Err(png::error::PngError::UnsupportedInterlace(header.interlace_method).into());
            }
            let filtered = zlib::decompress(&stream)?;
            let rows = count_scanlines(filtered.len(), stride)?;
            let sealed = unfilter_scanlines(&filtered, stride, header.bytes_per_pixel(), rows)?;

            let layout = BlockLayout::for_modulus(&key.modulus)?;
            let expected = layout
                .ciphertext_len(header.raw_len())
                .ok_or(png::error::PngError::InvalidHeader("image too large"))?;
            if sealed.len() < expected {
                return Err(CryptError::BlockAlignment { len: sealed.len(), block_size: layout.block_size });
            }
            let mut raw = block::decrypt(&sealed[..expected], key, chaining)?;
            raw.truncate(header.raw_len());
            tracing::debug!(rows, expected, raw = raw.len(), "decrypted pixel stream");
            Ok(png::encode_pixels(&header, &raw, config.filter)?)
        }
    }
}

/// Insert a seed chunk directly after IHDR, replacing any existing one.
pub fn attach_seed(chunks: &[Chunk], seed: &ChainingSeed) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = chunks.iter().filter(|c| c.tag != SEED_TAG).cloned().collect();
    let at = usize::from(out.first().is_some_and(|c| c.tag == ChunkTag::IHDR));
    out.insert(at, Chunk::new(SEED_TAG, seed.as_bytes().to_vec()));
    out
}

/// Remove the seed chunk and return its contents.
pub fn detach_seed(chunks: &[Chunk]) -> (Option<ChainingSeed>, Vec<Chunk>) {
    let mut seed = None;
    let mut rest = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.tag == SEED_TAG {
            if seed.is_some() {
                tracing::warn!("multiple seed chunks, using the first");
            } else {
                seed = Some(ChainingSeed::from_bytes(chunk.data.clone()));
            }
        } else {
            rest.push(chunk.clone());
        }
    }
    (seed, rest)
}
