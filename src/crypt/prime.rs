// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Probabilistic primality testing.
//!
//! Key generation only needs a yes/no oracle, so it is a trait; the
//! default is trial division by small primes followed by Miller-Rabin with
//! random bases.

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::RngCore;

/// Primes below 200, used to reject most candidates cheaply.
const SMALL_PRIMES: [u32; 46] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199,
];

/// A probabilistic primality oracle.
pub trait PrimalityTest {
    /// `true` if `candidate` is prime with high probability, `false` if it
    /// is certainly composite.
    fn is_probably_prime(&self, candidate: &BigUint, rng: &mut dyn RngCore) -> bool;
}

/// Miller-Rabin with `rounds` independent random witnesses.
///
/// A composite passes a single round with probability at most 1/4.
#[derive(Debug, Clone, Copy)]
pub struct MillerRabin {
    pub rounds: u32,
}

impl Default for MillerRabin {
    fn default() -> Self {
        Self { rounds: 32 }
    }
}

impl PrimalityTest for MillerRabin {
    fn is_probably_prime(&self, candidate: &BigUint, rng: &mut dyn RngCore) -> bool {
        let n = candidate;
        let two = BigUint::from(2u32);
        if n < &two {
            return false;
        }
        for &p in &SMALL_PRIMES {
            let p = BigUint::from(p);
            if n == &p {
                return true;
            }
            if (n % &p).is_zero() {
                return false;
            }
        }

        // n - 1 = d * 2^s with d odd
        let one = BigUint::one();
        let n_minus_one = n - &one;
        let s = n_minus_one.trailing_zeros().unwrap_or(0);
        let d = &n_minus_one >> s;

        'witness: for _ in 0..self.rounds {
            let a = rng.gen_biguint_range(&two, &n_minus_one);
            let mut x = a.modpow(&d, n);
            if x == one || x == n_minus_one {
                continue;
            }
            for _ in 1..s {
                x = (&x * &x) % n;
                if x == n_minus_one {
                    continue 'witness;
                }
            }
            return false;
        }
        true
    }
}
