//! Moser-flow loss.
//!
//! A Moser flow models the data density directly as
//!
//! ```text
//! mu(x) = nu(x) - div u(x)
//! ```
//!
//! where nu is a tractable base density and u a learned drift. Since
//! ∫ div u = 0 on a closed manifold, mu integrates to one; it is a density
//! wherever it is non-negative. The loss maximizes log mu at the data and
//! penalizes the mass where mu falls below a floor:
//!
//! ```text
//! loss = -mean_data log mu⁺ + alpha_m · E_{x~nu}[ mu⁻(x) / nu(x) ]
//! mu⁺ = max(eps, mu),  mu⁻ = eps - min(eps, mu)
//! ```
//!
//! The drift is evaluated at t = 0 throughout, i.e. treated as autonomous,
//! even when the model is time-conditioned.

use crate::{
    divergence::{HutchinsonEstimator, HutchinsonNoise},
    loss::{mean, report, LossFunction, LossOutput},
};
use num_traits::Float;
use riemannscore_core::{
    batch::Batch,
    error::{TrainingError, TrainingResult},
    field::VectorField,
    manifold::Manifold,
    random::PrngKey,
    score::{ScoreFunction, ScoreModel},
    types::{Point, Scalar},
};
use riemannscore_sde::BaseDistribution;
use tracing::debug;

/// Configuration for [`MoserLoss`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoserConfig<T: Scalar> {
    /// Weight of the negative-mass penalty.
    pub alpha_m: T,
    /// Number of base samples used to estimate the penalty.
    pub k: usize,
    /// Probe distribution for the divergence.
    pub hutchinson: HutchinsonNoise,
    /// Density floor.
    pub eps: T,
}

impl<T: Scalar> Default for MoserConfig<T> {
    fn default() -> Self {
        Self {
            alpha_m: <T as Scalar>::from_f64(100.0),
            k: 1000,
            hutchinson: HutchinsonNoise::Rademacher,
            eps: <T as Scalar>::from_f64(1e-5),
        }
    }
}

impl<T: Scalar> MoserConfig<T> {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the penalty weight.
    pub fn with_alpha_m(mut self, alpha_m: T) -> Self {
        self.alpha_m = alpha_m;
        self
    }

    /// Sets the number of penalty samples.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the probe distribution.
    pub fn with_hutchinson(mut self, noise: HutchinsonNoise) -> Self {
        self.hutchinson = noise;
        self
    }

    /// Sets the density floor.
    pub fn with_eps(mut self, eps: T) -> Self {
        self.eps = eps;
        self
    }

    fn validate(&self) -> TrainingResult<()> {
        if self.k == 0 {
            return Err(TrainingError::invalid_configuration(
                "penalty needs at least one base sample",
                "k",
                self.k,
            ));
        }
        if !<T as Float>::is_finite(self.alpha_m) || self.alpha_m < T::zero() {
            return Err(TrainingError::invalid_configuration(
                "penalty weight must be non-negative and finite",
                "alpha_m",
                self.alpha_m,
            ));
        }
        if !<T as Float>::is_finite(self.eps) || self.eps <= T::zero() {
            return Err(TrainingError::invalid_configuration(
                "density floor must be positive and finite",
                "eps",
                self.eps,
            ));
        }
        Ok(())
    }
}

/// Splits a density value at the floor `eps`.
///
/// Returns `(mu⁺, mu⁻)` with `mu⁺ = max(eps, mu) ≥ eps` and
/// `mu⁻ = eps - min(eps, mu) ≥ 0`. A NaN density yields NaN for both.
pub fn split_density<T: Scalar>(mu: T, eps: T) -> (T, T) {
    if <T as Float>::is_nan(mu) {
        return (mu, mu);
    }
    let plus = <T as Float>::max(eps, mu);
    let minus = eps - <T as Float>::min(eps, mu);
    (plus, minus)
}

/// Moser-flow loss for a drift model over a base distribution.
#[derive(Debug)]
pub struct MoserLoss<'a, T: Scalar, M: ?Sized, B, Mod> {
    manifold: &'a M,
    base: &'a B,
    model: &'a Mod,
    config: MoserConfig<T>,
    estimator: HutchinsonEstimator,
}

impl<'a, T, M, B, Mod> MoserLoss<'a, T, M, B, Mod>
where
    T: Scalar,
    M: Manifold<T> + ?Sized,
    B: BaseDistribution<T>,
    Mod: ScoreModel<T>,
{
    /// Creates the loss.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `k` is zero, `alpha_m` is negative,
    /// or `eps` is not positive.
    pub fn new(manifold: &'a M, base: &'a B, model: &'a Mod, config: MoserConfig<T>) -> TrainingResult<Self> {
        config.validate()?;
        debug!(
            manifold = manifold.name(),
            alpha_m = ?config.alpha_m,
            k = config.k,
            hutchinson = %config.hutchinson,
            eps = ?config.eps,
            "Moser loss constructed"
        );
        Ok(Self {
            manifold,
            base,
            model,
            config,
            estimator: HutchinsonEstimator::new(config.hutchinson),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MoserConfig<T> {
        &self.config
    }

    /// Evaluates `(mu⁺, mu⁻)` at each point with a fixed drift realization.
    fn density_split<F>(&self, field: &F, key: PrngKey, x: &[Point<T>]) -> TrainingResult<Vec<(T, T)>>
    where
        F: VectorField<T> + ?Sized,
    {
        let t = vec![T::zero(); x.len()];
        let div = self.estimator.estimate(key, self.manifold, field, x, &t)?;
        x.iter()
            .zip(div)
            .map(|(xi, div_i)| {
                let mu = self.base.prob(xi)? - div_i;
                Ok(split_density(mu, self.config.eps))
            })
            .collect()
    }
}

impl<T, M, B, Mod> LossFunction<T, Mod> for MoserLoss<'_, T, M, B, Mod>
where
    T: Scalar,
    M: Manifold<T> + ?Sized,
    B: BaseDistribution<T>,
    Mod: ScoreModel<T>,
{
    /// The returned state is the input state, unchanged.
    fn loss(
        &self,
        key: PrngKey,
        params: &Mod::Params,
        state: Mod::State,
        batch: &Batch<T>,
    ) -> TrainingResult<LossOutput<T, Mod::State>> {
        batch.validate(self.manifold)?;
        let n = batch.len();

        let (drift_key, rest) = key.split();
        let (data_noise_key, rest) = rest.split();
        let (base_key, base_noise_key) = rest.split();

        let drift = ScoreFunction::new(self.manifold, self.model, params, state, false);
        let field = drift.frozen_field(drift_key.freeze());

        let data_split = self.density_split(&field, data_noise_key, &batch.data)?;
        let log_mu: Vec<T> = data_split.iter().map(|(plus, _)| <T as Float>::ln(*plus)).collect();
        let log_prob = mean(&log_mu);

        let xs = self.base.sample(base_key, self.config.k)?;
        let base_split = self.density_split(&field, base_noise_key, &xs)?;
        let mut deficits = Vec::with_capacity(xs.len());
        for (xi, (_, minus)) in xs.iter().zip(&base_split) {
            deficits.push(*minus / self.base.prob(xi)?);
        }
        let volume_m = mean(&deficits);

        let loss = -log_prob + self.config.alpha_m * volume_m;
        report("moser", n, loss);

        let state = drift.state().clone();
        Ok(LossOutput { loss, state })
    }
}
