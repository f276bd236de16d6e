// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for key generation, the block cipher and the chunk pipeline.
//!
//! [`CryptError`] covers all failure modes from PNG parsing through block
//! encryption and decryption. Every variant is fatal: the pipeline either
//! returns a complete output or an error, never partial output.

use core::fmt;

use crate::png::error::PngError;

/// Errors that can occur while generating keys or transforming chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptError {
    /// The input could not be parsed or re-encoded as PNG.
    Png(PngError),
    /// Ciphertext length is not a multiple of the cipher block size.
    BlockAlignment { len: usize, block_size: usize },
    /// An exponentiation result did not fit the block size derived from the
    /// modulus. Indicates a key/block-size mismatch, never bad input.
    BlockSizeDerivation { needed: usize, block_size: usize },
    /// A decrypted block does not fit the plaintext block size (wrong key
    /// or corrupted ciphertext).
    PlaintextOutOfRange,
    /// CBC chaining seed is shorter than the plaintext block.
    SeedTooShort { len: usize, required: usize },
    /// CBC decryption needs a seed but none was given or embedded.
    MissingSeed,
    /// The requested prime size leaves no room for plaintext in a block.
    KeySizeTooSmall(u64),
    /// No prime was found within the retry bound.
    PrimeSearchExhausted { bits: u64 },
}

impl fmt::Display for CryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png(e) => write!(f, "invalid PNG: {e}"),
            Self::BlockAlignment { len, block_size } => {
                write!(f, "ciphertext length {len} is not a multiple of the {block_size}-byte block size")
            }
            Self::BlockSizeDerivation { needed, block_size } => {
                write!(f, "value needs {needed} bytes but the key's block size is {block_size}")
            }
            Self::PlaintextOutOfRange => write!(f, "decrypted block out of range (wrong key?)"),
            Self::SeedTooShort { len, required } => {
                write!(f, "chaining seed is {len} bytes, need at least {required}")
            }
            Self::MissingSeed => write!(f, "CBC decryption requires a chaining seed"),
            Self::KeySizeTooSmall(bits) => write!(f, "{bits}-bit primes are too small for a usable block"),
            Self::PrimeSearchExhausted { bits } => write!(f, "no {bits}-bit prime found within the retry bound"),
        }
    }
}

impl std::error::Error for CryptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Png(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PngError> for CryptError {
    fn from(e: PngError) -> Self {
        Self::Png(e)
    }
}

pub type Result<T> = std::result::Result<T, CryptError>;
