//! Brownian motion on a manifold with a linear noise schedule.
//!
//! The process has zero drift and isotropic diffusion `sqrt(beta(t))`, where
//!
//! ```text
//! beta(t) = beta_0 + (t - t0) / (tf - t0) * (beta_f - beta_0)
//! ```
//!
//! With the heat semigroup generated by ½Δ, the law of x_t given x_0 is the
//! heat kernel evaluated at the accumulated schedule
//!
//! ```text
//! s(t) = ∫_{t0}^{t} beta(u) du
//!      = (t - t0) beta_0 + ½ (t - t0)² (beta_f - beta_0) / (tf - t0)
//! ```
//!
//! which on `[0, 1]` is `2 (¼ t² (beta_f - beta_0) + ½ t beta_0)`.
//!
//! Density evaluations and the integrated fallback follow `s(t)`. A manifold
//! with a closed-form random walk is instead asked for a transition of elapsed
//! time `t`, so the closed-form marginal only matches the heat kernel when
//! `s(t) = t` (for example `beta_0 = beta_f = 1` on `[0, 1]`).

use crate::{
    sde::{Diffusion, Sde, SdeCoefficients, Trajectory},
    solver::{EulerMaruyama, EulerMaruyamaConfig},
};
use num_traits::Float;
use riemannscore_core::{
    error::{TrainingError, TrainingResult},
    manifold::{Manifold, RandomWalk},
    random::PrngKey,
    types::{Point, Scalar, TangentVector},
};
use tracing::debug;

/// Time interval and noise schedule of a [`Brownian`] SDE.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrownianConfig<T: Scalar> {
    /// Start time.
    pub t0: T,
    /// End time.
    pub tf: T,
    /// Noise rate at `t0`.
    pub beta_0: T,
    /// Noise rate at `tf`.
    pub beta_f: T,
}

impl<T: Scalar> Default for BrownianConfig<T> {
    fn default() -> Self {
        Self {
            t0: T::zero(),
            tf: T::one(),
            beta_0: <T as Scalar>::from_f64(0.1),
            beta_f: <T as Scalar>::from_f64(20.0),
        }
    }
}

impl<T: Scalar> BrownianConfig<T> {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time interval.
    pub fn with_time_interval(mut self, t0: T, tf: T) -> Self {
        self.t0 = t0;
        self.tf = tf;
        self
    }

    /// Sets the noise rates at both ends of the interval.
    pub fn with_schedule(mut self, beta_0: T, beta_f: T) -> Self {
        self.beta_0 = beta_0;
        self.beta_f = beta_f;
        self
    }

    fn validate(&self) -> TrainingResult<()> {
        if !<T as Float>::is_finite(self.t0) || !<T as Float>::is_finite(self.tf) || self.t0 >= self.tf {
            return Err(TrainingError::invalid_configuration(
                "time interval must satisfy t0 < tf",
                "tf",
                self.tf,
            ));
        }
        for (name, value) in [("beta_0", self.beta_0), ("beta_f", self.beta_f)] {
            if !<T as Float>::is_finite(value) || value <= T::zero() {
                return Err(TrainingError::invalid_configuration(
                    "noise rate must be positive and finite",
                    name,
                    value,
                ));
            }
        }
        Ok(())
    }
}

/// Brownian motion on `M` with a linear noise schedule.
///
/// `marginal_prob` uses the Euclidean variance-preserving schedule as its
/// standard deviation. It is exact only on flat space and is used purely as a
/// loss weighting, never as the sampling law.
#[derive(Debug, Clone)]
pub struct Brownian<T: Scalar, M> {
    manifold: M,
    config: BrownianConfig<T>,
    solver: EulerMaruyama,
}

impl<T: Scalar, M: Manifold<T>> Brownian<T, M> {
    /// Creates a Brownian SDE using a 100-step integration fallback.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `t0 >= tf` or a noise rate is not
    /// positive.
    pub fn new(manifold: M, config: BrownianConfig<T>) -> TrainingResult<Self> {
        Self::with_solver(manifold, config, EulerMaruyamaConfig::default())
    }

    /// Creates a Brownian SDE with a custom integration fallback.
    pub fn with_solver(
        manifold: M,
        config: BrownianConfig<T>,
        solver: EulerMaruyamaConfig,
    ) -> TrainingResult<Self> {
        config.validate()?;
        let solver = EulerMaruyama::new(solver)?;
        debug!(
            manifold = manifold.name(),
            t0 = ?config.t0,
            tf = ?config.tf,
            beta_0 = ?config.beta_0,
            beta_f = ?config.beta_f,
            steps = solver.config().num_steps,
            "Brownian SDE constructed"
        );
        Ok(Self {
            manifold,
            config,
            solver,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BrownianConfig<T> {
        &self.config
    }

    /// Returns the integration fallback.
    pub fn solver(&self) -> &EulerMaruyama {
        &self.solver
    }

    /// Returns the concrete manifold.
    pub fn space(&self) -> &M {
        &self.manifold
    }

    /// Noise rate beta(t).
    pub fn beta_t(&self, t: T) -> T {
        let c = &self.config;
        let normed_t = (t - c.t0) / (c.tf - c.t0);
        c.beta_0 + normed_t * (c.beta_f - c.beta_0)
    }

    /// Accumulated schedule s(t) = ∫_{t0}^{t} beta(u) du.
    ///
    /// This is the elapsed heat-kernel time of the transition x_{t0} → x_t.
    pub fn beta_integral(&self, t: T) -> T {
        let c = &self.config;
        let half = <T as Scalar>::from_f64(0.5);
        let elapsed = t - c.t0;
        elapsed * c.beta_0 + half * elapsed * elapsed * (c.beta_f - c.beta_0) / (c.tf - c.t0)
    }
}

impl<T: Scalar, M: Manifold<T>> SdeCoefficients<T> for Brownian<T, M> {
    fn manifold(&self) -> &dyn Manifold<T> {
        &self.manifold
    }

    fn t0(&self) -> T {
        self.config.t0
    }

    fn tf(&self) -> T {
        self.config.tf
    }

    fn coefficients(&self, x: &Point<T>, t: T) -> TrainingResult<(TangentVector<T>, Diffusion<T>)> {
        let drift = TangentVector::zeros(x.len());
        Ok((drift, Diffusion::Scalar(<T as Float>::sqrt(self.beta_t(t)))))
    }
}

impl<T: Scalar, M: Manifold<T>> Sde<T> for Brownian<T, M> {
    fn marginal_prob(&self, x: &Point<T>, t: T) -> TrainingResult<(Point<T>, T)> {
        let log_mean_coeff = -<T as Scalar>::from_f64(0.5) * self.beta_integral(t);
        let two = <T as Scalar>::from_f64(2.0);
        let std = <T as Float>::sqrt(T::one() - <T as Float>::exp(two * log_mean_coeff));
        Ok((Point::zeros(x.len()), std))
    }

    fn marginal_sample(&self, key: PrngKey, x0: &Point<T>, t: T) -> TrainingResult<Point<T>> {
        let (walk_key, integrate_key) = key.split();
        match self.manifold.random_walk(walk_key, x0, t)? {
            RandomWalk::Exact(x) => Ok(x),
            RandomWalk::IntegrationRequired => {
                debug!(
                    manifold = self.manifold.name(),
                    steps = self.solver.config().num_steps,
                    "no closed-form random walk, integrating forward SDE"
                );
                let mut trajectory = self.solver.integrate(self, integrate_key, x0, self.config.t0, t)?;
                trajectory
                    .states
                    .pop()
                    .ok_or_else(|| TrainingError::model("integration produced an empty trajectory"))
            }
        }
    }

    fn marginal_sample_with_history(
        &self,
        key: PrngKey,
        x0: &Point<T>,
        t: T,
    ) -> TrainingResult<Trajectory<T>> {
        self.solver.integrate(self, key, x0, self.config.t0, t)
    }

    fn marginal_log_prob(&self, x0: &Point<T>, x: &Point<T>, t: T) -> TrainingResult<T> {
        Ok(self.manifold.log_heat_kernel(x0, x, self.beta_integral(t))?)
    }

    fn grad_marginal_log_prob(&self, x0: &Point<T>, x: &Point<T>, t: T) -> TrainingResult<TangentVector<T>> {
        Ok(self.manifold.grad_log_heat_kernel(x0, x, self.beta_integral(t))?)
    }

    fn varadhan_exp(
        &self,
        xs: &Point<T>,
        xt: &Point<T>,
        s: T,
        t: T,
    ) -> TrainingResult<(TangentVector<T>, T)> {
        let delta = self.beta_integral(t) - self.beta_integral(s);
        let grad = self.manifold.log_map(xt, xs)? / delta;
        Ok((grad, delta))
    }

    fn sample_limiting_distribution(&self, key: PrngKey, n_samples: usize) -> TrainingResult<Vec<Point<T>>> {
        Ok(self.manifold.random_uniform(key, n_samples)?)
    }

    fn limiting_distribution_logp(&self, z: &[Point<T>]) -> TrainingResult<Vec<T>> {
        let log_volume = self.manifold.log_volume()?;
        Ok(vec![-log_volume; z.len()])
    }
}
