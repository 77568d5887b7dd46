//! Flat Euclidean space R^n.
//!
//! The trivial manifold: every operation has a closed form, the random walk
//! is exact Gaussian sampling and the heat kernel is the Gaussian density.
//! It stands in for a manifold in tests and toy experiments.

use riemannscore_core::{
    error::{ManifoldError, Result},
    manifold::{Manifold, RandomWalk},
    random::{standard_normal_vector, PrngKey},
    types::{constants, Point, Scalar, TangentVector},
};
use num_traits::Float;

/// Euclidean space R^n with the standard inner product.
///
/// # Mathematical Properties
///
/// - **Dimension**: n
/// - **Tangent space**: T_x R^n = R^n
/// - **Exponential map**: exp_x(v) = x + v
/// - **Heat kernel**: p_s(x₀, x) = N(x; x₀, s·I)
///
/// R^n has infinite volume, so uniform sampling and `log_volume` are not
/// available.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Euclidean {
    dim: usize,
}

impl Euclidean {
    /// Creates R^n.
    ///
    /// # Errors
    /// Returns an error if `dim` is zero.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(ManifoldError::invalid_point(
                "Euclidean space requires dimension >= 1",
            ));
        }
        Ok(Self { dim })
    }
}

impl<T: Scalar> Manifold<T> for Euclidean {
    fn name(&self) -> &str {
        "Euclidean"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn ambient_dimension(&self) -> usize {
        self.dim
    }

    fn is_point_on_manifold(&self, point: &Point<T>, _tol: T) -> bool {
        point.len() == self.dim && point.iter().all(|v| <T as Float>::is_finite(*v))
    }

    fn project_tangent(&self, _point: &Point<T>, vector: &TangentVector<T>) -> Result<TangentVector<T>> {
        Ok(vector.clone())
    }

    fn inner_product(&self, _point: &Point<T>, u: &TangentVector<T>, v: &TangentVector<T>) -> Result<T> {
        Ok(u.dot(v))
    }

    fn exp_map(&self, point: &Point<T>, tangent: &TangentVector<T>) -> Result<Point<T>> {
        Ok(point + tangent)
    }

    fn log_map(&self, point: &Point<T>, other: &Point<T>) -> Result<TangentVector<T>> {
        Ok(other - point)
    }

    fn random_walk(&self, key: PrngKey, point: &Point<T>, s: T) -> Result<RandomWalk<T>> {
        let mut rng = key.into_rng();
        let noise: TangentVector<T> = standard_normal_vector(&mut rng, self.dim);
        Ok(RandomWalk::Exact(point + noise * <T as Float>::sqrt(s)))
    }

    fn log_heat_kernel(&self, x0: &Point<T>, x: &Point<T>, s: T) -> Result<T> {
        let half = <T as Scalar>::from_f64(0.5);
        let n = <T as Scalar>::from_usize(self.dim);
        let sq_dist = (x - x0).norm_squared();
        Ok(-half * sq_dist / s - half * n * <T as Float>::ln(constants::tau::<T>() * s))
    }

    fn grad_log_heat_kernel(&self, x0: &Point<T>, x: &Point<T>, s: T) -> Result<TangentVector<T>> {
        Ok((x0 - x) / s)
    }

    fn random_uniform(&self, _key: PrngKey, _n_samples: usize) -> Result<Vec<Point<T>>> {
        Err(ManifoldError::not_implemented(
            "uniform sampling on Euclidean space (infinite volume)",
        ))
    }

    fn log_volume(&self) -> Result<T> {
        Err(ManifoldError::not_implemented(
            "volume of Euclidean space (infinite volume)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use riemannscore_core::types::DVector;

    #[test]
    fn test_euclidean_creation() {
        let space = Euclidean::new(3).unwrap();
        assert_eq!(<Euclidean as Manifold<f64>>::dimension(&space), 3);
        assert!(Euclidean::new(0).is_err());
    }

    #[test]
    fn test_heat_kernel_is_gaussian() {
        let space = Euclidean::new(2).unwrap();
        let x0 = DVector::from_vec(vec![0.0, 0.0]);
        let x = DVector::from_vec(vec![1.0, 0.0]);

        // N(x; 0, 2 I) in 2D: exp(-1/4) / (4π)
        let expected = (-0.25_f64).exp() / (4.0 * std::f64::consts::PI);
        let logp = space.log_heat_kernel(&x0, &x, 2.0).unwrap();
        assert_relative_eq!(logp, expected.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_random_walk_is_exact_and_deterministic() {
        let space = Euclidean::new(2).unwrap();
        let x0 = DVector::from_vec(vec![1.0, -1.0]);

        let a = space.random_walk(PrngKey::new(9), &x0, 0.5).unwrap();
        let b = space.random_walk(PrngKey::new(9), &x0, 0.5).unwrap();
        assert_eq!(a, b);
        assert!(matches!(a, RandomWalk::Exact(_)));
    }

    #[test]
    fn test_random_walk_variance() {
        let space = Euclidean::new(1).unwrap();
        let x0 = DVector::from_vec(vec![0.0]);
        let s = 4.0;

        let keys = PrngKey::new(1).split_n(20_000);
        let samples: Vec<f64> = keys
            .into_iter()
            .map(|key| space.random_walk(key, &x0, s).unwrap().exact().unwrap()[0])
            .collect();
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.1);
        assert!((var - s).abs() < 0.2);
    }

    #[test]
    fn test_uniform_not_available() {
        let space = Euclidean::new(2).unwrap();
        let result = <Euclidean as Manifold<f64>>::random_uniform(&space, PrngKey::new(0), 4);
        assert!(matches!(result, Err(ManifoldError::NotImplemented { .. })));
    }
}
