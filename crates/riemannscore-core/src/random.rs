//! Explicit, splittable random keys.
//!
//! Every stochastic operation in the workspace consumes a [`PrngKey`] by
//! value. A key that is needed for more than one draw must first be split
//! into independent sub-keys; `PrngKey` is neither `Clone` nor
//! `Copy`, so reading the same key twice does not type-check.
//!
//! The one sanctioned exception is [`FrozenKey`]: a key that is frozen can be
//! thawed repeatedly into identical keys. It exists for estimators that must
//! hold a network's stochasticity fixed across several evaluations of the
//! same quantity, such as the Jacobian-vector products behind one divergence
//! estimate.
//!
//! Streams come from `ChaCha8Rng`, which is reproducible across platforms and
//! crate versions, so a fixed seed yields bit-identical losses.

use crate::types::{DVector, Scalar};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// A move-only random key.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a PrngKey does nothing unless it is split or turned into an rng"]
pub struct PrngKey {
    seed: [u8; 32],
}

impl PrngKey {
    /// Creates a root key from an integer seed.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self { seed: bytes }
    }

    /// Splits the key into two independent keys.
    pub fn split(self) -> (PrngKey, PrngKey) {
        let mut rng = self.into_rng();
        (Self::draw(&mut rng), Self::draw(&mut rng))
    }

    /// Splits the key into `n` independent keys.
    pub fn split_n(self, n: usize) -> Vec<PrngKey> {
        let mut rng = self.into_rng();
        (0..n).map(|_| Self::draw(&mut rng)).collect()
    }

    /// Consumes the key and returns the generator it seeds.
    pub fn into_rng(self) -> ChaCha8Rng {
        ChaCha8Rng::from_seed(self.seed)
    }

    /// Freezes the key so the same randomness can be replayed.
    pub fn freeze(self) -> FrozenKey {
        FrozenKey { seed: self.seed }
    }

    fn draw(rng: &mut ChaCha8Rng) -> PrngKey {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        PrngKey { seed: bytes }
    }
}

/// A key whose randomness is intentionally replayable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenKey {
    seed: [u8; 32],
}

impl FrozenKey {
    /// Produces a key identical to the one that was frozen.
    pub fn thaw(&self) -> PrngKey {
        PrngKey { seed: self.seed }
    }
}

/// Draws `n` scalars uniformly from `[low, high)`.
pub fn uniform_scalars<T: Scalar>(key: PrngKey, n: usize, low: T, high: T) -> Vec<T> {
    let mut rng = key.into_rng();
    let width = high - low;
    (0..n)
        .map(|_| low + width * <T as Scalar>::from_f64(rng.gen::<f64>()))
        .collect()
}

/// Draws a vector of independent standard normal entries.
pub fn standard_normal_vector<T: Scalar, R: Rng + ?Sized>(rng: &mut R, dim: usize) -> DVector<T> {
    DVector::from_fn(dim, |_, _| {
        let val: f64 = StandardNormal.sample(&mut *rng);
        <T as Scalar>::from_f64(val)
    })
}

/// Draws a vector of independent ±1 entries.
pub fn rademacher_vector<T: Scalar, R: Rng + ?Sized>(rng: &mut R, dim: usize) -> DVector<T> {
    DVector::from_fn(dim, |_, _| if rng.gen::<bool>() { T::one() } else { -T::one() })
}
