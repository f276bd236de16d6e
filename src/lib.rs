// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! # pngcrypt
//!
//! Pure-Rust PNG chunk codec plus a modular-exponentiation block cipher for
//! encrypting the contents of PNG files.
//!
//! - **Codec** (`png` module): splits a PNG into chunks and writes it back
//!   with recomputed CRCs, reconstructs raw scanlines from the filtered IDAT
//!   stream, and decodes common metadata chunks.
//! - **Cipher** (`crypt` module): RSA-style key pairs, ECB and CBC block
//!   modes, and a pipeline that encrypts selected chunks (or the decoded
//!   pixels) while leaving the rest of the file intact.
//!
//! The cipher uses no randomized padding. It hides image content from casual
//! viewing; it is not a secure encryption scheme.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use pngcrypt::{encrypt_png, decrypt_png, Chaining, KeyPair, TransformConfig};
//!
//! let png = std::fs::read("photo.png").unwrap();
//! let pair = KeyPair::generate(512).unwrap();
//! let config = TransformConfig::default();
//! let sealed = encrypt_png(&png, &pair.public_key(), &Chaining::Ecb, &config).unwrap();
//! let opened = decrypt_png(&sealed, &pair.private_key(), &Chaining::Ecb, &config).unwrap();
//! ```

pub mod png;
pub mod crypt;

pub use png::chunk::{Chunk, ChunkKind, ChunkTag};
pub use png::error::{PngError, Result as PngResult};
pub use png::filter::{FilterStrategy, FilterType};
pub use png::header::{ColorType, ImageHeader};
pub use png::metadata::Metadata;
pub use png::PngFile;
pub use crypt::{
    attach_seed, decrypt_chunks, decrypt_png, detach_seed, encrypt_chunks, encrypt_png, BlockLayout, Chaining,
    ChainingSeed, ChunkSelector, CipherMode, CryptError, Granularity, KeyPair, PaddingPolicy, PrivateKey,
    PublicKey, TransformConfig,
};
