// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Key generation, block cipher and the PNG chunk pipeline.
//!
//! - [`prime`]: probabilistic primality oracle (Miller-Rabin)
//! - [`keys`]: RSA-style key pairs from two random primes
//! - [`block`]: fixed-size exponentiation cipher, ECB and CBC
//! - [`pipeline`]: applies the cipher to selected chunks of a PNG
//!
//! This is textbook exponentiation without randomized padding. It is
//! deterministic in ECB mode and malleable in both modes; use it for
//! obfuscating image records, not for protecting secrets.

pub mod error;
pub mod prime;
pub mod keys;
pub mod block;
pub mod pipeline;

pub use block::{decrypt, encrypt, BlockLayout, Chaining, ChainingSeed, CipherMode};
pub use error::CryptError;
pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use pipeline::{
    attach_seed, decrypt_chunks, decrypt_png, detach_seed, encrypt_chunks, encrypt_png, ChunkSelector,
    Granularity, PaddingPolicy, TransformConfig, SEED_TAG,
};
pub use prime::{MillerRabin, PrimalityTest};
