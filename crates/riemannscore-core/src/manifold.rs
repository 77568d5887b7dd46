//! The manifold capability consumed by SDEs and loss estimators.
//!
//! Score-based generative modelling on a Riemannian manifold only needs a
//! handful of geometric primitives: local moves (`exp_map`, `log_map`,
//! tangent projection), the metric, a transition kernel (random walk and heat
//! kernel) and a uniform measure. Any geometry backend implementing
//! [`Manifold`] is interchangeable behind the SDEs in `riemannscore-sde`.
//!
//! # Mathematical Background
//!
//! Brownian motion on (M, g) is the diffusion generated by ½Δ_g, where Δ_g is
//! the Laplace–Beltrami operator. Its transition density is the heat kernel
//! p_s(x₀, x), which is the Gaussian N(x₀, s·I) on flat space and has no closed
//! form on most curved spaces. Backends therefore report whether they can
//! sample the random walk exactly through [`RandomWalk`].

use crate::{
    error::Result,
    random::{standard_normal_vector, PrngKey},
    types::{Point, Scalar, TangentVector},
};
use std::fmt::Debug;

/// Outcome of asking a manifold for a closed-form random-walk sample.
///
/// Replaces a nullable return: callers must handle both paths explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum RandomWalk<T: Scalar> {
    /// The manifold sampled the heat-kernel transition exactly.
    Exact(Point<T>),
    /// No closed form exists; the caller must integrate the SDE numerically.
    IntegrationRequired,
}

impl<T: Scalar> RandomWalk<T> {
    /// Returns the exact sample, if any.
    pub fn exact(self) -> Option<Point<T>> {
        match self {
            RandomWalk::Exact(point) => Some(point),
            RandomWalk::IntegrationRequired => None,
        }
    }
}

/// Geometry capability of a Riemannian manifold.
///
/// Points and tangent vectors are stored in embedding coordinates of length
/// [`ambient_dimension`](Manifold::ambient_dimension).
///
/// # Required properties
///
/// 1. `project_tangent(x, v)` lies in T_x M and is idempotent.
/// 2. `exp_map(x, 0) = x` and `log_map(x, exp_map(x, v)) ≈ v` for small v.
/// 3. `inner_product` is symmetric positive definite on each tangent space.
/// 4. `grad_log_heat_kernel(x₀, x, s)` is the Riemannian gradient in `x` of
///    `log_heat_kernel(x₀, x, s)`.
pub trait Manifold<T: Scalar>: Debug + Send + Sync {
    /// Returns a human-readable name for the manifold.
    fn name(&self) -> &str;

    /// Returns the intrinsic dimension of the manifold.
    fn dimension(&self) -> usize;

    /// Returns the length of the embedding coordinates of a point.
    fn ambient_dimension(&self) -> usize;

    /// Checks if a point lies on the manifold within a given tolerance.
    fn is_point_on_manifold(&self, point: &Point<T>, tol: T) -> bool;

    /// Projects an ambient vector onto the tangent space at `point`.
    fn project_tangent(&self, point: &Point<T>, vector: &TangentVector<T>) -> Result<TangentVector<T>>;

    /// Riemannian inner product ⟨u, v⟩ at `point`.
    fn inner_product(&self, point: &Point<T>, u: &TangentVector<T>, v: &TangentVector<T>) -> Result<T>;

    /// Squared metric norm ‖v‖²_g at `point`.
    fn squared_norm(&self, point: &Point<T>, vector: &TangentVector<T>) -> Result<T> {
        self.inner_product(point, vector, vector)
    }

    /// Exponential map exp_x(v).
    fn exp_map(&self, point: &Point<T>, tangent: &TangentVector<T>) -> Result<Point<T>>;

    /// Logarithmic map log_x(y), the tangent vector at `point` pointing to `other`.
    fn log_map(&self, point: &Point<T>, other: &Point<T>) -> Result<TangentVector<T>>;

    /// Samples a heat-kernel transition of elapsed time `s` started at `point`.
    ///
    /// Returns [`RandomWalk::IntegrationRequired`] when the manifold has no
    /// closed-form sampler.
    fn random_walk(&self, key: PrngKey, point: &Point<T>, s: T) -> Result<RandomWalk<T>>;

    /// Log-density of the heat kernel p_s(x₀, x).
    fn log_heat_kernel(&self, x0: &Point<T>, x: &Point<T>, s: T) -> Result<T>;

    /// Riemannian gradient ∇ₓ log p_s(x₀, x).
    fn grad_log_heat_kernel(&self, x0: &Point<T>, x: &Point<T>, s: T) -> Result<TangentVector<T>>;

    /// Draws `n_samples` points from the normalized volume measure.
    fn random_uniform(&self, key: PrngKey, n_samples: usize) -> Result<Vec<Point<T>>>;

    /// Logarithm of the total Riemannian volume.
    fn log_volume(&self) -> Result<T>;

    /// Draws a standard Gaussian vector in the tangent space at `point`.
    ///
    /// The default projects an ambient standard normal, which is a standard
    /// Gaussian on T_x M for embedded manifolds with the induced metric.
    fn random_normal_tangent(&self, key: PrngKey, point: &Point<T>) -> Result<TangentVector<T>> {
        let mut rng = key.into_rng();
        let ambient = standard_normal_vector(&mut rng, self.ambient_dimension());
        self.project_tangent(point, &ambient)
    }

    /// Geodesic distance, via the norm of the logarithmic map.
    fn distance(&self, x: &Point<T>, y: &Point<T>) -> Result<T> {
        let log = self.log_map(x, y)?;
        self.squared_norm(x, &log).map(<T as num_traits::Float>::sqrt)
    }
}
