//! Reproducible randomness for the audit.
//!
//! Nothing in the simulation touches a process-wide generator. Every draw goes
//! through an [`AuditRng`] handle built from a [`Seed`] by [`create_generator`],
//! so that giving the same seed gives the same audit.

use std::fmt::Display;
use std::str::FromStr;

use log::debug;
use num::{BigInt, BigUint};
use rand::seq::SliceRandom;
use rand_distr::{Binomial, Distribution, Gamma};
use rand_mt::Mt19937GenRand32;

use crate::config::AuditError;

/// An arbitrarily large non-negative integer seed.
#[derive(Eq, PartialEq, Debug, Clone, Hash, PartialOrd, Ord)]
pub struct Seed(BigUint);

impl Seed {
    /// The base 2^32 digits of the seed, least significant word first.
    ///
    /// Example: 2^64 + 5 yields `[5, 0, 1]`. Zero yields an empty list.
    pub fn to_u32_words(&self) -> Vec<u32> {
        self.0.to_u32_digits()
    }

    /// `self + step * times`
    pub fn advanced(&self, step: u64, times: u64) -> Seed {
        Seed(&self.0 + BigUint::from(step) * BigUint::from(times))
    }

    pub fn offset(&self, by: u64) -> Seed {
        Seed(&self.0 + BigUint::from(by))
    }
}

impl From<u64> for Seed {
    fn from(v: u64) -> Self {
        Seed(BigUint::from(v))
    }
}

impl From<BigUint> for Seed {
    fn from(v: BigUint) -> Self {
        Seed(v)
    }
}

impl TryFrom<BigInt> for Seed {
    type Error = AuditError;

    fn try_from(v: BigInt) -> Result<Self, Self::Error> {
        v.to_biguint().map(Seed).ok_or_else(|| {
            AuditError::InvalidSeed(format!("{} is not a nonnegative integer", v))
        })
    }
}

impl TryFrom<i64> for Seed {
    type Error = AuditError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        Seed::try_from(BigInt::from(v))
    }
}

impl FromStr for Seed {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = BigInt::from_str(s.trim()).map_err(|_| {
            AuditError::InvalidSeed(format!("{:?} is not an integer", s))
        })?;
        Seed::try_from(v)
    }
}

impl Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds the generator for a seed, or an entropy-seeded one for `None`.
///
/// The seed words initialize a Mersenne Twister (MT19937) through its
/// `init_by_array` procedure. The zero seed has no words and is keyed with the
/// single word `[0]`; no other seed has that key since its most significant
/// word is never zero.
pub fn create_generator(seed: Option<&Seed>) -> AuditRng {
    let inner = match seed {
        Some(s) => {
            let mut key = s.to_u32_words();
            if key.is_empty() {
                key.push(0);
            }
            Mt19937GenRand32::new_with_key(key)
        }
        None => {
            debug!("create_generator: no seed provided, drawing one from entropy");
            Mt19937GenRand32::new_with_key(rand::random::<[u32; 4]>())
        }
    };
    AuditRng { inner }
}

/// An explicit generator handle, threaded through every random operation.
pub struct AuditRng {
    inner: Mt19937GenRand32,
}

impl AuditRng {
    /// A draw from Gamma(shape, scale = 1).
    pub fn gamma(&mut self, shape: f64) -> Result<f64, AuditError> {
        if !(shape.is_finite() && shape > 0.0) {
            return Err(AuditError::ArithmeticDegenerate(format!(
                "gamma shape must be positive, got {}",
                shape
            )));
        }
        let dist = Gamma::new(shape, 1.0)
            .map_err(|e| AuditError::ArithmeticDegenerate(format!("{:?}", e)))?;
        Ok(dist.sample(&mut self.inner))
    }

    /// Splits `n` trials among the categories with the given weights.
    ///
    /// The weights do not need to be normalized. Each category but the last is
    /// drawn as a binomial conditioned on what the previous ones took; the last
    /// one receives the remainder, so the counts always add up to `n`.
    pub fn multinomial(&mut self, n: u64, weights: &[f64]) -> Result<Vec<u64>, AuditError> {
        let total_weight: f64 = weights.iter().sum();
        if weights.is_empty() || !(total_weight.is_finite() && total_weight > 0.0) {
            return Err(AuditError::ArithmeticDegenerate(format!(
                "cannot draw a multinomial from weights {:?}",
                weights
            )));
        }
        if weights.iter().any(|w| !(*w >= 0.0)) {
            return Err(AuditError::ArithmeticDegenerate(format!(
                "negative weight in {:?}",
                weights
            )));
        }

        let last = weights.len() - 1;
        let mut counts = vec![0u64; weights.len()];
        let mut remaining = n;
        let mut remaining_p = 1.0;
        for (idx, w) in weights[..last].iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let p = w / total_weight;
            // Rounding can push the ratio slightly outside of [0, 1].
            let conditional = if remaining_p > 0.0 {
                (p / remaining_p).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let draw = Binomial::new(remaining, conditional)
                .map_err(|e| AuditError::ArithmeticDegenerate(format!("{:?}", e)))?
                .sample(&mut self.inner);
            counts[idx] = draw;
            remaining -= draw;
            remaining_p -= p;
        }
        counts[last] += remaining;
        Ok(counts)
    }

    /// Uniform in-place shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}
