// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! RSA-style key pair generation.
//!
//! Two distinct random primes `p`, `q` of the requested bit length give the
//! modulus `n = p*q`. The public exponent is 65537 when it is coprime with
//! `phi = (p-1)(q-1)`, otherwise the smallest odd coprime value from 3 up.
//! The private exponent is the modular inverse of `e` mod `phi`.
//!
//! The private exponent is held as big-endian bytes in a [`Zeroizing`]
//! buffer, wiped on drop. `BigUint` values rebuilt from it for `modpow` are
//! transient and not wiped.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;
use zeroize::Zeroizing;

use super::block::BlockLayout;
use super::error::{CryptError, Result};
use super::prime::{MillerRabin, PrimalityTest};

/// Preferred public exponent (F4).
pub const DEFAULT_PUBLIC_EXPONENT: u32 = 65537;

/// Smallest prime size whose modulus leaves at least one plaintext byte
/// per block.
pub const MIN_PRIME_BITS: u64 = 48;

/// Candidates drawn per prime before giving up. Roughly `bits * ln 2 / 2`
/// odd candidates are needed on average, so this is a wide margin.
fn candidate_budget(bits: u64) -> u64 {
    bits.saturating_mul(64).max(4096)
}

/// Public half: `(n, e)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub modulus: BigUint,
    pub exponent: BigUint,
}

/// Private half: `(n, d)`.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub modulus: BigUint,
    exponent: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    pub fn new(modulus: BigUint, exponent: &BigUint) -> Self {
        Self { modulus, exponent: Zeroizing::new(exponent.to_bytes_be()) }
    }

    /// The private exponent `d`.
    pub fn exponent(&self) -> BigUint {
        BigUint::from_bytes_be(&self.exponent)
    }
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("modulus_bits", &self.modulus.bits())
            .finish_non_exhaustive()
    }
}

/// A matched public/private key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    modulus: BigUint,
    public_exponent: BigUint,
    private_exponent: Zeroizing<Vec<u8>>,
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("modulus_bits", &self.modulus.bits())
            .field("public_exponent", &self.public_exponent)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a key pair from two `prime_bits`-bit primes using the
    /// thread-local RNG and Miller-Rabin.
    pub fn generate(prime_bits: u64) -> Result<Self> {
        Self::generate_with(prime_bits, &mut rand::thread_rng(), &MillerRabin::default())
    }

    /// Generate a key pair with an explicit RNG and primality oracle.
    pub fn generate_with<R: Rng>(prime_bits: u64, rng: &mut R, oracle: &dyn PrimalityTest) -> Result<Self> {
        if prime_bits < MIN_PRIME_BITS {
            return Err(CryptError::KeySizeTooSmall(prime_bits));
        }

        let p = random_prime(prime_bits, rng, oracle)?;
        let mut q = random_prime(prime_bits, rng, oracle)?;
        while q == p {
            q = random_prime(prime_bits, rng, oracle)?;
        }

        let modulus = &p * &q;
        let one = BigUint::one();
        let phi = (&p - &one) * (&q - &one);
        let public_exponent = choose_public_exponent(&phi);
        // e is coprime with phi by construction, so the inverse exists.
        let private_exponent =
            mod_inverse(&public_exponent, &phi).ok_or(CryptError::PrimeSearchExhausted { bits: prime_bits })?;

        let pair = Self::from_parts(modulus, public_exponent, private_exponent);
        let layout = BlockLayout::for_modulus(&pair.modulus)
            .map_err(|_| CryptError::KeySizeTooSmall(prime_bits))?;
        tracing::debug!(
            prime_bits,
            modulus_bits = pair.modulus.bits(),
            block_size = layout.block_size,
            payload_size = layout.payload_size,
            e = %pair.public_exponent,
            "generated key pair"
        );
        Ok(pair)
    }

    /// Assemble a key pair from known components (e.g. a stored key file).
    /// No consistency check is made.
    pub fn from_parts(modulus: BigUint, public_exponent: BigUint, private_exponent: BigUint) -> Self {
        Self { modulus, public_exponent, private_exponent: Zeroizing::new(private_exponent.to_bytes_be()) }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn public_exponent(&self) -> &BigUint {
        &self.public_exponent
    }

    pub fn private_exponent(&self) -> BigUint {
        BigUint::from_bytes_be(&self.private_exponent)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey { modulus: self.modulus.clone(), exponent: self.public_exponent.clone() }
    }

    pub fn private_key(&self) -> PrivateKey {
        PrivateKey { modulus: self.modulus.clone(), exponent: self.private_exponent.clone() }
    }

    /// Block geometry for this key's modulus.
    pub fn layout(&self) -> Result<BlockLayout> {
        BlockLayout::for_modulus(&self.modulus)
    }
}

/// Draw odd `bits`-bit candidates (top bit set) until one passes `oracle`.
fn random_prime<R: Rng>(bits: u64, rng: &mut R, oracle: &dyn PrimalityTest) -> Result<BigUint> {
    let budget = candidate_budget(bits);
    for attempt in 1..=budget {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if oracle.is_probably_prime(&candidate, rng) {
            tracing::trace!(bits, attempt, "prime found");
            return Ok(candidate);
        }
    }
    tracing::warn!(bits, budget, "prime search exhausted");
    Err(CryptError::PrimeSearchExhausted { bits })
}

/// 65537 if coprime with `phi`, else the smallest odd `e >= 3` that is.
pub fn choose_public_exponent(phi: &BigUint) -> BigUint {
    let preferred = BigUint::from(DEFAULT_PUBLIC_EXPONENT);
    if preferred.gcd(phi).is_one() {
        return preferred;
    }
    let mut e = BigUint::from(3u32);
    while !e.gcd(phi).is_one() {
        e += 2u32;
    }
    tracing::debug!(%e, "65537 shares a factor with phi, using fallback exponent");
    e
}

/// Inverse of `a` modulo `m` by the iterative extended Euclidean algorithm.
/// `None` when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }
    let modulus = BigInt::from(m.clone());
    let (mut old_r, mut r) = (BigInt::from(a.clone()), modulus.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let q = &old_r / &r;
        let next_r = &old_r - &q * &r;
        old_r = core::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = core::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return None;
    }
    old_s.mod_floor(&modulus).to_biguint()
}
