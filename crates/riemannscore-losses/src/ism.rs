//! Implicit score matching.
//!
//! Uses the score-matching identity instead of a target score:
//!
//! ```text
//! E ‖s(x_t) - ∇ log p_t(x_t)‖² = E[ ‖s(x_t)‖² + 2 div s(x_t) ] + const
//! ```
//!
//! The per-example loss is `½ ‖s(x_t, t)‖²_g + div s(x_t, t)` with the
//! divergence estimated by a single Hutchinson probe, optionally weighted by
//! g(t)².

use crate::{
    divergence::{HutchinsonEstimator, HutchinsonNoise},
    loss::{mean, report, sample_times, validate_time_floor, LossFunction, LossOutput},
};
use riemannscore_core::{
    batch::Batch,
    error::TrainingResult,
    parallel::{map_examples, ParallelConfig},
    random::PrngKey,
    score::{ScoreFunction, ScoreModel},
    types::{Point, Scalar},
};
use riemannscore_sde::Sde;
use tracing::debug;

/// Configuration for [`IsmLoss`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IsmConfig<T: Scalar> {
    /// Train flag forwarded to the score model.
    pub train: bool,
    /// Weight each example by g(t)².
    pub like_w: bool,
    /// Probe distribution for the divergence.
    pub hutchinson: HutchinsonNoise,
    /// Lower floor on sampled times, t ≥ t0 + eps.
    pub eps: T,
}

impl<T: Scalar> Default for IsmConfig<T> {
    fn default() -> Self {
        Self {
            train: true,
            like_w: true,
            hutchinson: HutchinsonNoise::Rademacher,
            eps: <T as Scalar>::from_f64(1e-3),
        }
    }
}

impl<T: Scalar> IsmConfig<T> {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the train flag.
    pub fn with_train(mut self, train: bool) -> Self {
        self.train = train;
        self
    }

    /// Enables or disables likelihood weighting.
    pub fn with_likelihood_weighting(mut self, like_w: bool) -> Self {
        self.like_w = like_w;
        self
    }

    /// Sets the probe distribution.
    pub fn with_hutchinson(mut self, noise: HutchinsonNoise) -> Self {
        self.hutchinson = noise;
        self
    }

    /// Sets the time floor.
    pub fn with_eps(mut self, eps: T) -> Self {
        self.eps = eps;
        self
    }
}

/// Implicit score-matching loss for a forward SDE.
#[derive(Debug)]
pub struct IsmLoss<'a, T: Scalar, S, Mod> {
    sde: &'a S,
    model: &'a Mod,
    config: IsmConfig<T>,
    estimator: HutchinsonEstimator,
    parallel: ParallelConfig,
}

impl<'a, T, S, Mod> IsmLoss<'a, T, S, Mod>
where
    T: Scalar,
    S: Sde<T>,
    Mod: ScoreModel<T>,
{
    /// Creates the loss.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `eps` is negative or leaves no room
    /// in `[t0 + eps, tf]`.
    pub fn new(sde: &'a S, model: &'a Mod, config: IsmConfig<T>) -> TrainingResult<Self> {
        validate_time_floor(sde.t0(), sde.tf(), config.eps)?;
        debug!(
            manifold = sde.manifold().name(),
            like_w = config.like_w,
            hutchinson = %config.hutchinson,
            eps = ?config.eps,
            "ISM loss constructed"
        );
        Ok(Self {
            sde,
            model,
            config,
            estimator: HutchinsonEstimator::new(config.hutchinson),
            parallel: ParallelConfig::default(),
        })
    }

    /// Sets the batch-parallelism policy.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IsmConfig<T> {
        &self.config
    }
}

impl<T, S, Mod> LossFunction<T, Mod> for IsmLoss<'_, T, S, Mod>
where
    T: Scalar,
    S: Sde<T>,
    Mod: ScoreModel<T>,
{
    fn loss(
        &self,
        key: PrngKey,
        params: &Mod::Params,
        state: Mod::State,
        batch: &Batch<T>,
    ) -> TrainingResult<LossOutput<T, Mod::State>> {
        let sde = self.sde;
        let manifold = sde.manifold();
        batch.validate(manifold)?;
        let n = batch.len();

        let (time_key, rest) = key.split();
        let (sample_key, rest) = rest.split();
        let (score_key, noise_key) = rest.split();
        let t = sample_times(time_key, n, sde.t0(), sde.tf(), self.config.eps);

        let items: Vec<_> = batch
            .data
            .iter()
            .zip(t.iter().copied())
            .zip(sample_key.split_n(n))
            .collect();
        let x_t: Vec<Point<T>> = map_examples(items, &self.parallel, |_, ((x0, ti), k)| sde.marginal_sample(k, x0, ti))?;

        // The score and every evaluation behind its divergence share one key.
        let score_key = score_key.freeze();
        let score_fn = ScoreFunction::new(manifold, self.model, params, state, self.config.train);
        let output = score_fn.call(&x_t, &t, score_key.thaw())?;
        let div = self
            .estimator
            .estimate(noise_key, manifold, &score_fn.frozen_field(score_key), &x_t, &t)?;

        let half = <T as Scalar>::from_f64(0.5);
        let mut losses = Vec::with_capacity(n);
        for (((xi, score), div_i), ti) in x_t.iter().zip(&output.scores).zip(&div).zip(&t) {
            let mut loss = half * manifold.squared_norm(xi, score)? + *div_i;
            if self.config.like_w {
                let (_, diffusion) = sde.coefficients(&Point::zeros(xi.len()), *ti)?;
                loss *= diffusion.squared_scale();
            }
            losses.push(loss);
        }

        let loss = mean(&losses);
        report("ism", n, loss);
        Ok(LossOutput {
            loss,
            state: output.state,
        })
    }
}
