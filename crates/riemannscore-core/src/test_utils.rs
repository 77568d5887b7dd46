//! Test doubles shared across the workspace.
//!
//! Enabled with the `test-utils` feature. Provides a minimal flat manifold
//! and a few closed-form score models whose outputs are known exactly, so
//! that estimators can be checked against analytic values.

#![cfg(any(test, feature = "test-utils"))]

use crate::{
    error::{ManifoldError, Result, TrainingResult},
    manifold::{Manifold, RandomWalk},
    random::{standard_normal_vector, PrngKey},
    score::ScoreModel,
    types::{DMatrix, Point, Scalar, TangentVector},
};
use num_traits::Float;

/// Flat R^n with the Gaussian heat kernel.
#[derive(Debug, Clone)]
pub struct TestEuclideanManifold {
    dim: usize,
}

impl TestEuclideanManifold {
    /// Creates flat space of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl<T: Scalar> Manifold<T> for TestEuclideanManifold {
    fn name(&self) -> &str {
        "TestEuclidean"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn ambient_dimension(&self) -> usize {
        self.dim
    }

    fn is_point_on_manifold(&self, point: &Point<T>, _tol: T) -> bool {
        point.len() == self.dim
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
        let two_pi_s = crate::types::constants::tau::<T>() * s;
        Ok(-(x - x0).norm_squared() / (s + s) - half * n * <T as Float>::ln(two_pi_s))
    }

    fn grad_log_heat_kernel(&self, x0: &Point<T>, x: &Point<T>, s: T) -> Result<TangentVector<T>> {
        Ok((x0 - x) / s)
    }

    fn random_uniform(&self, _key: PrngKey, _n_samples: usize) -> Result<Vec<Point<T>>> {
        Err(ManifoldError::not_implemented("uniform sampling on unbounded space"))
    }

    fn log_volume(&self) -> Result<T> {
        Err(ManifoldError::not_implemented("volume of unbounded space"))
    }
}

/// Integral of the linear noise schedule, ∫₀ᵗ β(u) du for β(0)=β₀, β(1)=β_f.
pub fn linear_schedule_integral<T: Scalar>(t: T, beta_0: T, beta_f: T) -> T {
    let half = <T as Scalar>::from_f64(0.5);
    half * t * t * (beta_f - beta_0) + t * beta_0
}

/// Parameters of [`HeatKernelScoreModel`].
#[derive(Debug, Clone)]
pub struct HeatKernelScoreParams<T: Scalar> {
    /// Point every data sample sits on.
    pub center: Point<T>,
    /// Schedule start value.
    pub beta_0: T,
    /// Schedule end value.
    pub beta_f: T,
    /// Multiplier applied to the exact score.
    pub scale: T,
}

/// The heat-kernel score of flat Brownian motion started at a single point,
/// `-(x - center) / ∫β`, optionally scaled.
///
/// With `beta_0 = beta_f = 1` the schedule integral is `t`, and this is also
/// the exact score of the closed-form marginal sampler.
#[derive(Debug, Clone, Default)]
pub struct HeatKernelScoreModel;

impl<T: Scalar> ScoreModel<T> for HeatKernelScoreModel {
    type Params = HeatKernelScoreParams<T>;
    type State = ();

    fn apply(
        &self,
        params: &Self::Params,
        _state: &(),
        x: &[Point<T>],
        t: &[T],
        _key: PrngKey,
        _train: bool,
    ) -> TrainingResult<(Vec<TangentVector<T>>, ())> {
        let scores = x
            .iter()
            .zip(t)
            .map(|(xi, &ti)| {
                let s = linear_schedule_integral(ti, params.beta_0, params.beta_f);
                (&params.center - xi) * (params.scale / s)
            })
            .collect();
        Ok((scores, ()))
    }
}

/// A time-independent linear field `x -> A x`.
#[derive(Debug, Clone, Default)]
pub struct LinearScoreModel;

impl<T: Scalar> ScoreModel<T> for LinearScoreModel {
    type Params = DMatrix<T>;
    type State = ();

    fn apply(
        &self,
        params: &DMatrix<T>,
        _state: &(),
        x: &[Point<T>],
        _t: &[T],
        _key: PrngKey,
        _train: bool,
    ) -> TrainingResult<(Vec<TangentVector<T>>, ())> {
        Ok((x.iter().map(|xi| params * xi).collect(), ()))
    }
}

/// A zero field whose state counts how many times it was applied.
#[derive(Debug, Clone, Default)]
pub struct CountingZeroModel;

impl<T: Scalar> ScoreModel<T> for CountingZeroModel {
    type Params = ();
    type State = usize;

    fn apply(
        &self,
        _params: &(),
        state: &usize,
        x: &[Point<T>],
        _t: &[T],
        _key: PrngKey,
        _train: bool,
    ) -> TrainingResult<(Vec<TangentVector<T>>, usize)> {
        let zeros = x.iter().map(|xi| TangentVector::zeros(xi.len())).collect();
        Ok((zeros, state + 1))
    }
}
