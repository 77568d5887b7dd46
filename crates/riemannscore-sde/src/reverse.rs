//! Time reversal of a forward SDE.
//!
//! Given a forward process dx = f dt + G dW and a score function
//! s(x, t) ≈ ∇ log p_t(x), the reverse-time process (Anderson, 1982) runs over
//! the swapped interval with drift
//!
//! ```text
//! f_rev(x, t) = f(x, t) - G Gᵀ s(x, t)
//! ```
//!
//! and the same diffusion. The formula assumes the forward diffusion does not
//! depend on x; the divergence of G Gᵀ is not included.

use crate::sde::{Diffusion, SdeCoefficients};
use riemannscore_core::{
    error::TrainingResult,
    manifold::Manifold,
    types::{Point, Scalar, TangentVector},
};
use std::fmt;
use std::marker::PhantomData;

/// The reverse-time process of a forward SDE `S`, driven by `score_fn`.
pub struct ReverseSde<'a, T, S, F>
where
    T: Scalar,
    S: SdeCoefficients<T>,
{
    forward: &'a S,
    score_fn: F,
    _scalar: PhantomData<fn() -> T>,
}

impl<'a, T, S, F> ReverseSde<'a, T, S, F>
where
    T: Scalar,
    S: SdeCoefficients<T>,
    F: Fn(&Point<T>, T) -> TrainingResult<TangentVector<T>> + Send + Sync,
{
    /// Reverses `forward` using `score_fn`.
    pub fn new(forward: &'a S, score_fn: F) -> Self {
        Self {
            forward,
            score_fn,
            _scalar: PhantomData,
        }
    }

    /// Returns the forward process this one reverses.
    ///
    /// Reversing twice yields the original object, not a recomputed copy.
    pub fn reverse(&self) -> &'a S {
        self.forward
    }

    /// Evaluates the score function driving the reversal.
    pub fn score(&self, x: &Point<T>, t: T) -> TrainingResult<TangentVector<T>> {
        (self.score_fn)(x, t)
    }
}

impl<T, S, F> SdeCoefficients<T> for ReverseSde<'_, T, S, F>
where
    T: Scalar,
    S: SdeCoefficients<T>,
    F: Fn(&Point<T>, T) -> TrainingResult<TangentVector<T>> + Send + Sync,
{
    fn manifold(&self) -> &dyn Manifold<T> {
        self.forward.manifold()
    }

    fn t0(&self) -> T {
        self.forward.tf()
    }

    fn tf(&self) -> T {
        self.forward.t0()
    }

    fn coefficients(&self, x: &Point<T>, t: T) -> TrainingResult<(TangentVector<T>, Diffusion<T>)> {
        let (forward_drift, diffusion) = self.forward.coefficients(x, t)?;
        let score = (self.score_fn)(x, t)?;
        let reverse_drift = forward_drift - diffusion.apply_ggt(&score);
        Ok((reverse_drift, diffusion))
    }
}

impl<T, S, F> fmt::Debug for ReverseSde<'_, T, S, F>
where
    T: Scalar,
    S: SdeCoefficients<T> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseSde")
            .field("forward", self.forward)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        brownian::{Brownian, BrownianConfig},
        sde::Sde,
        solver::{EulerMaruyama, EulerMaruyamaConfig},
    };
    use approx::assert_relative_eq;
    use riemannscore_core::{random::PrngKey, test_utils::TestEuclideanManifold, types::DMatrix};
    use riemannscore_manifolds::Euclidean;

    fn plane() -> Brownian<f64, Euclidean> {
        Brownian::new(Euclidean::new(2).unwrap(), BrownianConfig::<f64>::default()).unwrap()
    }

    #[test]
    fn test_interval_is_swapped() {
        let sde = plane();
        let reverse = sde.reverse(|x: &Point<f64>, _t: f64| Ok(x.clone()));
        assert_eq!(reverse.t0(), 1.0);
        assert_eq!(reverse.tf(), 0.0);
    }

    #[test]
    fn test_double_reverse_is_original() {
        let sde = plane();
        let reverse = sde.reverse(|x: &Point<f64>, _t: f64| Ok(x * 2.0));
        let original = reverse.reverse();
        assert!(std::ptr::eq(original, &sde));

        let x = Point::from_vec(vec![0.3, -0.7]);
        for &t in &[0.0, 0.25, 1.0] {
            assert_eq!(original.coefficients(&x, t).unwrap(), sde.coefficients(&x, t).unwrap());
        }
    }

    #[test]
    fn test_scalar_diffusion_drift_correction() {
        let sde = plane();
        let reverse = sde.reverse(|x: &Point<f64>, _t: f64| Ok(x * 2.0));
        let x = Point::from_vec(vec![1.0, -2.0]);

        let (drift, diffusion) = reverse.coefficients(&x, 0.5).unwrap();
        let beta = sde.beta_t(0.5);
        assert_relative_eq!(drift, -&x * (2.0 * beta), epsilon = 1e-12);
        assert_eq!(diffusion, Diffusion::Scalar(beta.sqrt()));
    }

    #[derive(Debug)]
    struct Anisotropic {
        manifold: TestEuclideanManifold,
        g: DMatrix<f64>,
    }

    impl SdeCoefficients<f64> for Anisotropic {
        fn manifold(&self) -> &dyn Manifold<f64> {
            &self.manifold
        }

        fn t0(&self) -> f64 {
            0.0
        }

        fn tf(&self) -> f64 {
            1.0
        }

        fn coefficients(&self, x: &Point<f64>, _t: f64) -> TrainingResult<(TangentVector<f64>, Diffusion<f64>)> {
            Ok((x * 0.5, Diffusion::Matrix(self.g.clone())))
        }
    }

    #[test]
    fn test_matrix_diffusion_drift_correction() {
        let forward = Anisotropic {
            manifold: TestEuclideanManifold::new(2),
            g: DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 2.0]),
        };
        let reverse = ReverseSde::new(&forward, |_x: &Point<f64>, _t: f64| {
            Ok(TangentVector::from_vec(vec![1.0, 1.0]))
        });

        let x = Point::from_vec(vec![2.0, 4.0]);
        let (drift, _) = reverse.coefficients(&x, 0.1).unwrap();
        let score = TangentVector::from_vec(vec![1.0, 1.0]);
        let expected = &x * 0.5 - &forward.g * forward.g.transpose() * score;
        assert_relative_eq!(drift, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_score_errors_propagate() {
        let sde = plane();
        let reverse = sde.reverse(|_x: &Point<f64>, _t: f64| {
            Err(riemannscore_core::error::TrainingError::model("score unavailable"))
        });
        assert!(reverse.coefficients(&Point::zeros(2), 0.5).is_err());
    }

    #[test]
    fn test_reverse_process_integrates_backwards() {
        let sde = plane();
        let reverse = sde.reverse(|x: &Point<f64>, _t: f64| Ok(-x));
        let solver = EulerMaruyama::new(EulerMaruyamaConfig::new().with_num_steps(10)).unwrap();

        let x0 = Point::from_vec(vec![1.0, 1.0]);
        let trajectory = solver
            .integrate(&reverse, PrngKey::new(4), &x0, reverse.t0(), reverse.tf())
            .unwrap();
        assert_eq!(trajectory.times[0], 1.0);
        assert_eq!(*trajectory.times.last().unwrap(), 0.0);
    }
}
