// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Fixed-size modular-exponentiation block cipher in ECB and CBC modes.
//!
//! Block geometry comes from the modulus: a ciphertext block is
//! `ceil(bits(n) / 8)` bytes, a plaintext block is 11 bytes shorter. The
//! 11-byte reservation keeps every plaintext integer well below `n`; it is
//! not a real padding scheme. Plaintext is zero-padded to whole blocks and
//! the padding is not removed on decryption, callers strip it when they know
//! the content (see [`strip_zero_padding`]).
//!
//! CBC XORs each plaintext block with the leading `payload_size` bytes of
//! the previous ciphertext block, starting from a caller-supplied
//! [`ChainingSeed`].

use num_bigint::BigUint;
use rand::RngCore;

use super::error::{CryptError, Result};
use super::keys::{PrivateKey, PublicKey};

/// Bytes reserved in every block so that plaintext integers stay below `n`.
pub const PADDING_OVERHEAD: usize = 11;

/// Cipher block geometry for one modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// Ciphertext block length in bytes.
    pub block_size: usize,
    /// Plaintext block length in bytes.
    pub payload_size: usize,
}

impl BlockLayout {
    pub fn for_modulus(modulus: &BigUint) -> Result<Self> {
        let block_size = (modulus.bits() as usize).div_ceil(8);
        if block_size <= PADDING_OVERHEAD {
            return Err(CryptError::BlockSizeDerivation { needed: PADDING_OVERHEAD + 1, block_size });
        }
        Ok(Self { block_size, payload_size: block_size - PADDING_OVERHEAD })
    }

    /// Number of blocks needed for `plaintext_len` bytes.
    pub fn block_count(&self, plaintext_len: usize) -> usize {
        plaintext_len.div_ceil(self.payload_size)
    }

    /// Ciphertext length produced for `plaintext_len` bytes, `None` if it
    /// does not fit in `usize`.
    pub fn ciphertext_len(&self, plaintext_len: usize) -> Option<usize> {
        self.block_count(plaintext_len).checked_mul(self.block_size)
    }
}

/// Initial chaining value for CBC.
///
/// Must be at least one plaintext block long. Use a fresh random seed per
/// encryption; the same seed is needed again to decrypt.
#[derive(Clone, PartialEq, Eq)]
pub struct ChainingSeed(Vec<u8>);

impl ChainingSeed {
    /// `len` random bytes from the thread-local RNG.
    pub fn random(len: usize) -> Self {
        Self::random_with(len, &mut rand::thread_rng())
    }

    pub fn random_with<R: RngCore>(len: usize, rng: &mut R) -> Self {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Random seed sized for one plaintext block of `layout`.
    pub fn for_layout(layout: &BlockLayout) -> Self {
        Self::random(layout.payload_size)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for ChainingSeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ChainingSeed({} bytes)", self.0.len())
    }
}

/// Block chaining mode without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherMode {
    #[default]
    Ecb,
    Cbc,
}

/// Block chaining mode with the CBC seed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Chaining {
    #[default]
    Ecb,
    Cbc(ChainingSeed),
}

impl Chaining {
    pub fn mode(&self) -> CipherMode {
        match self {
            Self::Ecb => CipherMode::Ecb,
            Self::Cbc(_) => CipherMode::Cbc,
        }
    }
}

/// One direction of `x -> x^exp mod n` over fixed-width blocks.
struct Exponentiator<'k> {
    modulus: &'k BigUint,
    exponent: &'k BigUint,
    layout: BlockLayout,
}

impl<'k> Exponentiator<'k> {
    fn new(modulus: &'k BigUint, exponent: &'k BigUint) -> Result<Self> {
        Ok(Self { modulus, exponent, layout: BlockLayout::for_modulus(modulus)? })
    }

    fn apply(&self, block: &[u8]) -> BigUint {
        BigUint::from_bytes_be(block).modpow(self.exponent, self.modulus)
    }

    /// Encrypt one plaintext block into `block_size` bytes.
    fn seal(&self, block: &[u8]) -> Result<Vec<u8>> {
        let value = self.apply(block);
        let block_size = self.layout.block_size;
        to_fixed_width(&value, block_size)
            .ok_or_else(|| CryptError::BlockSizeDerivation { needed: value.to_bytes_be().len(), block_size })
    }

    /// Decrypt one ciphertext block into `payload_size` bytes.
    fn open(&self, block: &[u8]) -> Result<Vec<u8>> {
        let value = self.apply(block);
        if let Some(bytes) = to_fixed_width(&value, self.layout.payload_size) {
            return Ok(bytes);
        }
        let needed = value.to_bytes_be().len();
        if needed > self.layout.block_size {
            return Err(CryptError::BlockSizeDerivation { needed, block_size: self.layout.block_size });
        }
        Err(CryptError::PlaintextOutOfRange)
    }
}

/// Big-endian bytes of `value`, left-padded with zeros to `width`.
/// `None` if the value needs more than `width` bytes.
fn to_fixed_width(value: &BigUint, width: usize) -> Option<Vec<u8>> {
    let bytes = value.to_bytes_be();
    // to_bytes_be yields [0] for zero
    let bytes: &[u8] = if bytes == [0] { &[] } else { &bytes };
    if bytes.len() > width {
        return None;
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    Some(out)
}

/// CBC chaining register: the seed at first, then the last ciphertext block.
struct ChainRegister {
    previous: Vec<u8>,
}

impl ChainRegister {
    fn prime(seed: &ChainingSeed, layout: &BlockLayout) -> Result<Self> {
        if seed.len() < layout.payload_size {
            return Err(CryptError::SeedTooShort { len: seed.len(), required: layout.payload_size });
        }
        Ok(Self { previous: seed.as_bytes().to_vec() })
    }

    /// XOR `block` with the leading bytes of the register.
    fn mask(&self, block: &mut [u8]) {
        for (b, p) in block.iter_mut().zip(&self.previous) {
            *b ^= p;
        }
    }

    fn advance(&mut self, ciphertext_block: &[u8]) {
        self.previous.clear();
        self.previous.extend_from_slice(ciphertext_block);
    }
}

/// Zero-pad `plaintext` to a whole number of plaintext blocks.
fn pad_to_blocks(plaintext: &[u8], layout: &BlockLayout) -> Vec<u8> {
    let mut padded = Vec::with_capacity(layout.block_count(plaintext.len()) * layout.payload_size);
    padded.extend_from_slice(plaintext);
    padded.resize(layout.block_count(plaintext.len()) * layout.payload_size, 0);
    padded
}

/// Encrypt `plaintext` under the public key.
///
/// Output length is `ceil(len / payload_size) * block_size`; empty input
/// gives empty output.
pub fn encrypt(plaintext: &[u8], key: &PublicKey, chaining: &Chaining) -> Result<Vec<u8>> {
    let engine = Exponentiator::new(&key.modulus, &key.exponent)?;
    let layout = engine.layout;
    let padded = pad_to_blocks(plaintext, &layout);
    tracing::trace!(
        len = plaintext.len(),
        blocks = layout.block_count(plaintext.len()),
        mode = ?chaining.mode(),
        "encrypting"
    );

    match chaining {
        Chaining::Ecb => encrypt_ecb(&engine, &padded),
        Chaining::Cbc(seed) => {
            let mut register = ChainRegister::prime(seed, &layout)?;
            let mut out = Vec::with_capacity(padded.len() / layout.payload_size * layout.block_size);
            let mut block = vec![0u8; layout.payload_size];
            for (i, chunk) in padded.chunks(layout.payload_size).enumerate() {
                block.copy_from_slice(chunk);
                register.mask(&mut block);
                let sealed = engine.seal(&block)?;
                tracing::trace!(block = i, "sealed");
                register.advance(&sealed);
                out.extend_from_slice(&sealed);
            }
            Ok(out)
        }
    }
}

/// Decrypt `ciphertext` under the private key.
///
/// Output is `blocks * payload_size` bytes including any zero padding added
/// on encryption.
pub fn decrypt(ciphertext: &[u8], key: &PrivateKey, chaining: &Chaining) -> Result<Vec<u8>> {
    let exponent = key.exponent();
    let engine = Exponentiator::new(&key.modulus, &exponent)?;
    let layout = engine.layout;
    if ciphertext.len() % layout.block_size != 0 {
        return Err(CryptError::BlockAlignment { len: ciphertext.len(), block_size: layout.block_size });
    }
    tracing::trace!(
        len = ciphertext.len(),
        blocks = ciphertext.len() / layout.block_size,
        mode = ?chaining.mode(),
        "decrypting"
    );

    match chaining {
        Chaining::Ecb => decrypt_ecb(&engine, ciphertext),
        Chaining::Cbc(seed) => {
            let mut register = ChainRegister::prime(seed, &layout)?;
            let mut out = Vec::with_capacity(ciphertext.len() / layout.block_size * layout.payload_size);
            for (i, block) in ciphertext.chunks(layout.block_size).enumerate() {
                let mut opened = engine.open(block)?;
                register.mask(&mut opened);
                tracing::trace!(block = i, "opened");
                register.advance(block);
                out.extend_from_slice(&opened);
            }
            Ok(out)
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn encrypt_ecb(engine: &Exponentiator<'_>, padded: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(padded.len() / engine.layout.payload_size * engine.layout.block_size);
    for block in padded.chunks(engine.layout.payload_size) {
        out.extend_from_slice(&engine.seal(block)?);
    }
    Ok(out)
}

#[cfg(not(feature = "parallel"))]
fn decrypt_ecb(engine: &Exponentiator<'_>, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(ciphertext.len() / engine.layout.block_size * engine.layout.payload_size);
    for block in ciphertext.chunks(engine.layout.block_size) {
        out.extend_from_slice(&engine.open(block)?);
    }
    Ok(out)
}

// ECB blocks are independent, so they can be processed on the rayon pool.
#[cfg(feature = "parallel")]
fn encrypt_ecb(engine: &Exponentiator<'_>, padded: &[u8]) -> Result<Vec<u8>> {
    use rayon::prelude::*;
    let blocks: Vec<Vec<u8>> = padded
        .par_chunks(engine.layout.payload_size)
        .map(|block| engine.seal(block))
        .collect::<Result<_>>()?;
    Ok(blocks.concat())
}

#[cfg(feature = "parallel")]
fn decrypt_ecb(engine: &Exponentiator<'_>, ciphertext: &[u8]) -> Result<Vec<u8>> {
    use rayon::prelude::*;
    let blocks: Vec<Vec<u8>> = ciphertext
        .par_chunks(engine.layout.block_size)
        .map(|block| engine.open(block))
        .collect::<Result<_>>()?;
    Ok(blocks.concat())
}

/// Remove trailing zero bytes left by block padding.
///
/// Only safe for content that cannot legitimately end in zero bytes.
pub fn strip_zero_padding(data: &mut Vec<u8>) {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    data.truncate(end);
}
