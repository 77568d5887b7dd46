//! The SDE contract.
//!
//! A forward noising process dx = f(x, t) dt + G(x, t) dW on a manifold is
//! described by two traits:
//!
//! - [`SdeCoefficients`]: the instantaneous dynamics over a time interval.
//!   Forward and reverse-time processes both implement it, so a single
//!   integrator drives either.
//! - [`Sde`]: a forward process that additionally knows its (possibly
//!   approximate) marginals, its transition kernel and its limiting
//!   distribution, and can be reversed given a score function.
//!
//! No operation assumes a flat ambient space. Where an implementation uses a
//! Euclidean shortcut it must say so in its documentation.

use crate::reverse::ReverseSde;
use riemannscore_core::{
    error::TrainingResult,
    manifold::Manifold,
    random::PrngKey,
    types::{DMatrix, Point, Scalar, TangentVector},
};

/// Diffusion coefficient G(x, t).
#[derive(Debug, Clone, PartialEq)]
pub enum Diffusion<T: Scalar> {
    /// Isotropic diffusion g·I.
    Scalar(T),
    /// Full matrix diffusion, acting on embedding coordinates.
    Matrix(DMatrix<T>),
}

impl<T: Scalar> Diffusion<T> {
    /// Computes G Gᵀ v.
    pub fn apply_ggt(&self, v: &TangentVector<T>) -> TangentVector<T> {
        match self {
            Diffusion::Scalar(g) => v * (*g * *g),
            Diffusion::Matrix(g) => g * (g.transpose() * v),
        }
    }

    /// Computes G z for a noise vector z.
    pub fn apply(&self, z: &TangentVector<T>) -> TangentVector<T> {
        match self {
            Diffusion::Scalar(g) => z * *g,
            Diffusion::Matrix(g) => g * z,
        }
    }

    /// Squared diffusion scale g².
    ///
    /// For a matrix diffusion this is the average diagonal entry of G Gᵀ,
    /// i.e. ‖G‖²_F divided by the number of rows.
    pub fn squared_scale(&self) -> T {
        match self {
            Diffusion::Scalar(g) => *g * *g,
            Diffusion::Matrix(g) => g.norm_squared() / <T as Scalar>::from_usize(g.nrows().max(1)),
        }
    }
}

/// A simulated trajectory of an SDE.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<T: Scalar> {
    /// States on the time grid, starting point included.
    pub states: Vec<Point<T>>,
    /// The time grid, `states.len()` entries.
    pub times: Vec<T>,
}

impl<T: Scalar> Trajectory<T> {
    /// The final state.
    pub fn last(&self) -> Option<&Point<T>> {
        self.states.last()
    }

    /// The state before the final one and the two last grid times.
    pub fn last_transition(&self) -> Option<(&Point<T>, T, T)> {
        let n = self.states.len();
        if n < 2 {
            return None;
        }
        Some((&self.states[n - 2], self.times[n - 2], self.times[n - 1]))
    }
}

/// Instantaneous dynamics of an SDE over `[t0, tf]`.
pub trait SdeCoefficients<T: Scalar>: Send + Sync {
    /// The manifold the process lives on.
    fn manifold(&self) -> &dyn Manifold<T>;

    /// Start of the time interval.
    fn t0(&self) -> T;

    /// End of the time interval.
    fn tf(&self) -> T;

    /// Drift f(x, t) in T_x M and diffusion G(x, t).
    ///
    /// Must be a pure function of `(x, t)` defined for every t in the
    /// interval.
    fn coefficients(&self, x: &Point<T>, t: T) -> TrainingResult<(TangentVector<T>, Diffusion<T>)>;
}

/// A forward noising process with known marginals and transition kernel.
pub trait Sde<T: Scalar>: SdeCoefficients<T> + Sized {
    /// Best-available mean and standard deviation of p(x_t | x_0 = x).
    ///
    /// Used only as a weighting factor; not assumed exact on curved spaces.
    fn marginal_prob(&self, x: &Point<T>, t: T) -> TrainingResult<(Point<T>, T)>;

    /// Draws x_t ~ p(x_t | x_0).
    fn marginal_sample(&self, key: PrngKey, x0: &Point<T>, t: T) -> TrainingResult<Point<T>>;

    /// Draws x_t by numerical integration and returns the whole trajectory.
    fn marginal_sample_with_history(
        &self,
        key: PrngKey,
        x0: &Point<T>,
        t: T,
    ) -> TrainingResult<Trajectory<T>>;

    /// Log-density of the transition kernel, log p(x_t = x | x_0).
    fn marginal_log_prob(&self, x0: &Point<T>, x: &Point<T>, t: T) -> TrainingResult<T>;

    /// Riemannian gradient ∇ₓ log p(x_t = x | x_0).
    fn grad_marginal_log_prob(&self, x0: &Point<T>, x: &Point<T>, t: T) -> TrainingResult<TangentVector<T>>;

    /// Local Gaussian approximation of the score of one transition x_s → x_t.
    ///
    /// Returns `(∇ log p(x_t | x_s), elapsed)` where `elapsed` is the noise
    /// accumulated between `s` and `t`.
    fn varadhan_exp(
        &self,
        xs: &Point<T>,
        xt: &Point<T>,
        s: T,
        t: T,
    ) -> TrainingResult<(TangentVector<T>, T)>;

    /// Samples the distribution the process converges to as t → tf.
    fn sample_limiting_distribution(&self, key: PrngKey, n_samples: usize) -> TrainingResult<Vec<Point<T>>>;

    /// Log-density of the limiting distribution at each point.
    fn limiting_distribution_logp(&self, z: &[Point<T>]) -> TrainingResult<Vec<T>>;

    /// The time-reversed process driven by `score_fn`.
    fn reverse<F>(&self, score_fn: F) -> ReverseSde<'_, T, Self, F>
    where
        F: Fn(&Point<T>, T) -> TrainingResult<TangentVector<T>> + Send + Sync,
    {
        ReverseSde::new(self, score_fn)
    }
}
