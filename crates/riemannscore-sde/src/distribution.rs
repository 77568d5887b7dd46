//! Tractable base distributions on a manifold.

use num_traits::Float;
use riemannscore_core::{
    error::TrainingResult,
    manifold::Manifold,
    random::PrngKey,
    types::{Point, Scalar},
};

/// A distribution with a tractable density and sampler.
pub trait BaseDistribution<T: Scalar>: Send + Sync {
    /// Log-density at `x` with respect to the Riemannian volume.
    fn log_prob(&self, x: &Point<T>) -> TrainingResult<T>;

    /// Draws `n_samples` independent points.
    fn sample(&self, key: PrngKey, n_samples: usize) -> TrainingResult<Vec<Point<T>>>;

    /// Density at `x`.
    fn prob(&self, x: &Point<T>) -> TrainingResult<T> {
        self.log_prob(x).map(<T as Float>::exp)
    }
}

/// The uniform distribution over a compact manifold.
#[derive(Debug, Clone)]
pub struct UniformDistribution<M> {
    manifold: M,
}

impl<M> UniformDistribution<M> {
    /// Uniform distribution over `manifold`.
    pub fn new(manifold: M) -> Self {
        Self { manifold }
    }

    /// The underlying manifold.
    pub fn manifold(&self) -> &M {
        &self.manifold
    }
}

impl<T: Scalar, M: Manifold<T>> BaseDistribution<T> for UniformDistribution<M> {
    fn log_prob(&self, _x: &Point<T>) -> TrainingResult<T> {
        Ok(-self.manifold.log_volume()?)
    }

    fn sample(&self, key: PrngKey, n_samples: usize) -> TrainingResult<Vec<Point<T>>> {
        Ok(self.manifold.random_uniform(key, n_samples)?)
    }
}
