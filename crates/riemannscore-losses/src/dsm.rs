//! Denoising score matching.
//!
//! For each example the loss draws a time t ~ U(t0 + eps, tf), noises the
//! data point to x_t ~ p(x_t | x_0) and regresses the model's score at
//! `(x_t, t)` onto a target score derived from the transition kernel:
//!
//! - anchored at x_0 (`s_zero = true`): ∇ log p(x_t | x_0) from the manifold's
//!   heat-kernel gradient;
//! - anchored at the previous step x_s of a simulated trajectory
//!   (`s_zero = false`): the Varadhan approximation log_{x_t}(x_s) / δ of the
//!   last transition.
//!
//! The squared error is reduced over coordinates (mean, or half-sum when
//! `reduce_mean` is off), then weighted by g(t)² (`like_w`) or by the squared
//! marginal standard deviation, and averaged over the batch.

use crate::loss::{mean, report, sample_times, validate_time_floor, LossFunction, LossOutput};
use riemannscore_core::{
    batch::Batch,
    error::{TrainingError, TrainingResult},
    parallel::{map_examples, ParallelConfig},
    random::PrngKey,
    score::{ScoreFunction, ScoreModel},
    types::{Point, Scalar, TangentVector},
};
use riemannscore_sde::Sde;
use tracing::debug;

/// Configuration for [`DsmLoss`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DsmConfig<T: Scalar> {
    /// Train flag forwarded to the score model.
    pub train: bool,
    /// Reduce the squared error over coordinates by its mean instead of half
    /// its sum.
    pub reduce_mean: bool,
    /// Weight each example by g(t)² instead of the marginal variance.
    pub like_w: bool,
    /// Lower floor on sampled times, t ≥ t0 + eps.
    pub eps: T,
    /// Anchor the target score at x_0 instead of the previous trajectory
    /// point.
    pub s_zero: bool,
}

impl<T: Scalar> Default for DsmConfig<T> {
    fn default() -> Self {
        Self {
            train: true,
            reduce_mean: true,
            like_w: true,
            eps: <T as Scalar>::from_f64(1e-3),
            s_zero: true,
        }
    }
}

impl<T: Scalar> DsmConfig<T> {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the train flag.
    pub fn with_train(mut self, train: bool) -> Self {
        self.train = train;
        self
    }

    /// Sets the coordinate reduction.
    pub fn with_reduce_mean(mut self, reduce_mean: bool) -> Self {
        self.reduce_mean = reduce_mean;
        self
    }

    /// Enables or disables likelihood weighting.
    pub fn with_likelihood_weighting(mut self, like_w: bool) -> Self {
        self.like_w = like_w;
        self
    }

    /// Sets the time floor.
    pub fn with_eps(mut self, eps: T) -> Self {
        self.eps = eps;
        self
    }

    /// Selects the target anchor.
    pub fn with_s_zero(mut self, s_zero: bool) -> Self {
        self.s_zero = s_zero;
        self
    }
}

/// Denoising score-matching loss for a forward SDE.
#[derive(Debug)]
pub struct DsmLoss<'a, T: Scalar, S, Mod> {
    sde: &'a S,
    model: &'a Mod,
    config: DsmConfig<T>,
    parallel: ParallelConfig,
}

/// Noised point, target score and weighting std for one example.
struct Perturbed<T: Scalar> {
    x_t: Point<T>,
    target: TangentVector<T>,
    std: T,
}

impl<'a, T, S, Mod> DsmLoss<'a, T, S, Mod>
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
    pub fn new(sde: &'a S, model: &'a Mod, config: DsmConfig<T>) -> TrainingResult<Self> {
        validate_time_floor(sde.t0(), sde.tf(), config.eps)?;
        debug!(
            manifold = sde.manifold().name(),
            reduce_mean = config.reduce_mean,
            like_w = config.like_w,
            s_zero = config.s_zero,
            eps = ?config.eps,
            "DSM loss constructed"
        );
        Ok(Self {
            sde,
            model,
            config,
            parallel: ParallelConfig::default(),
        })
    }

    /// Sets the batch-parallelism policy.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DsmConfig<T> {
        &self.config
    }

    fn perturb(&self, key: PrngKey, x0: &Point<T>, t: T) -> TrainingResult<Perturbed<T>> {
        let sde = self.sde;
        let zeros = Point::zeros(x0.len());
        if self.config.s_zero {
            let x_t = sde.marginal_sample(key, x0, t)?;
            let target = sde.grad_marginal_log_prob(x0, &x_t, t)?;
            let (_, std) = sde.marginal_prob(&zeros, t)?;
            return Ok(Perturbed { x_t, target, std });
        }

        let trajectory = sde.marginal_sample_with_history(key, x0, t)?;
        let (x_s, s, t_last) = trajectory
            .last_transition()
            .ok_or_else(|| TrainingError::model("trajectory has no transition"))?;
        let x_t = trajectory.states[trajectory.states.len() - 1].clone();
        let (target, _step_delta) = sde.varadhan_exp(x_s, &x_t, s, t_last)?;
        // Weighting uses the full time t, not the step's delta.
        let (_, std) = sde.marginal_prob(&zeros, t)?;
        Ok(Perturbed { x_t, target, std })
    }

    fn reduce(&self, squared: TangentVector<T>) -> T {
        if self.config.reduce_mean {
            squared.mean()
        } else {
            <T as Scalar>::from_f64(0.5) * squared.sum()
        }
    }
}

impl<T, S, Mod> LossFunction<T, Mod> for DsmLoss<'_, T, S, Mod>
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
        batch.validate(sde.manifold())?;
        let n = batch.len();

        let (time_key, rest) = key.split();
        let (sample_key, score_key) = rest.split();
        let t = sample_times(time_key, n, sde.t0(), sde.tf(), self.config.eps);

        let items: Vec<_> = batch
            .data
            .iter()
            .zip(t.iter().copied())
            .zip(sample_key.split_n(n))
            .collect();
        let perturbed = map_examples(items, &self.parallel, |_, ((x0, ti), k)| self.perturb(k, x0, ti))?;

        let x_t: Vec<Point<T>> = perturbed.iter().map(|p| p.x_t.clone()).collect();
        let score_fn = ScoreFunction::new(sde.manifold(), self.model, params, state, self.config.train);
        let output = score_fn.call(&x_t, &t, score_key)?;

        let mut losses = Vec::with_capacity(n);
        for ((example, score), ti) in perturbed.iter().zip(&output.scores).zip(&t) {
            let loss = if self.config.like_w {
                let (_, diffusion) = sde.coefficients(&Point::zeros(example.x_t.len()), *ti)?;
                let residual = score - &example.target;
                self.reduce(residual.component_mul(&residual)) * diffusion.squared_scale()
            } else {
                let residual = score * example.std - &example.target * example.std;
                self.reduce(residual.component_mul(&residual))
            };
            losses.push(loss);
        }

        let loss = mean(&losses);
        report("dsm", n, loss);
        Ok(LossOutput {
            loss,
            state: output.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use riemannscore_core::{
        test_utils::{CountingZeroModel, HeatKernelScoreModel, HeatKernelScoreParams},
        types::DVector,
    };
    use riemannscore_manifolds::Euclidean;
    use riemannscore_sde::{Brownian, BrownianConfig, SdeCoefficients};

    fn plane() -> Brownian<f64, Euclidean> {
        Brownian::new(Euclidean::new(2).unwrap(), BrownianConfig::<f64>::default()).unwrap()
    }

    fn origin_batch(n: usize) -> Batch<f64> {
        Batch::new(vec![DVector::zeros(2); n])
    }

    #[test]
    fn test_config_defaults() {
        let config = DsmConfig::<f64>::default();
        assert!(config.train);
        assert!(config.reduce_mean);
        assert!(config.like_w);
        assert!(config.s_zero);
        assert_eq!(config.eps, 1e-3);
    }

    #[test]
    fn test_eps_floor_rejected_at_construction() {
        let sde = plane();
        let model = CountingZeroModel;
        let result = DsmLoss::new(&sde, &model, DsmConfig::new().with_eps(1.5));
        assert!(matches!(result, Err(TrainingError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_zero_model_loss_is_weighted_target_norm() {
        // With a zero score the loss is the mean of g² · mean(target²).
        let sde = plane();
        let model = CountingZeroModel;
        let loss_fn = DsmLoss::new(&sde, &model, DsmConfig::default()).unwrap();

        let out = loss_fn.loss(PrngKey::new(0), &(), 0, &origin_batch(8)).unwrap();
        assert!(out.loss > 0.0);
        assert!(out.loss.is_finite());
        assert_eq!(out.state, 1);
    }

    #[test]
    fn test_heat_kernel_target_gives_zero_loss_on_flat_space() {
        let sde = plane();
        let model = HeatKernelScoreModel;
        let params = HeatKernelScoreParams {
            center: DVector::zeros(2),
            beta_0: 0.1,
            beta_f: 20.0,
            scale: 1.0,
        };
        let loss_fn = DsmLoss::new(&sde, &model, DsmConfig::default()).unwrap();

        let out = loss_fn.loss(PrngKey::new(42), &params, (), &origin_batch(16)).unwrap();
        assert_relative_eq!(out.loss, 0.0, epsilon = 1e-16);
    }

    fn space() -> Brownian<f64, Euclidean> {
        Brownian::new(Euclidean::new(3).unwrap(), BrownianConfig::<f64>::default()).unwrap()
    }

    fn skewed_batch() -> Batch<f64> {
        Batch::new(vec![
            DVector::from_vec(vec![1.0, -0.5, 2.0]),
            DVector::from_vec(vec![0.0, 0.3, -1.0]),
            DVector::from_vec(vec![-2.0, 0.0, 0.5]),
        ])
    }

    /// Replays the key schedule of `DsmLoss::loss` for `s_zero = true`,
    /// returning each example's time and regression target.
    fn replay_targets(sde: &Brownian<f64, Euclidean>, key: PrngKey, batch: &Batch<f64>) -> Vec<(f64, DVector<f64>)> {
        let n = batch.len();
        let (time_key, rest) = key.split();
        let (sample_key, _score_key) = rest.split();
        let t = sample_times(time_key, n, sde.t0(), sde.tf(), 1e-3);
        batch
            .data
            .iter()
            .zip(t)
            .zip(sample_key.split_n(n))
            .map(|((x0, ti), k)| {
                let x_t = sde.marginal_sample(k, x0, ti).unwrap();
                (ti, sde.grad_marginal_log_prob(x0, &x_t, ti).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_reductions_on_three_coordinates() {
        let sde = space();
        let model = CountingZeroModel;
        let batch = skewed_batch();
        let mean_loss = DsmLoss::new(&sde, &model, DsmConfig::default()).unwrap();
        let sum_loss = DsmLoss::new(&sde, &model, DsmConfig::new().with_reduce_mean(false)).unwrap();

        let a = mean_loss.loss(PrngKey::new(5), &(), 0, &batch).unwrap().loss;
        let b = sum_loss.loss(PrngKey::new(5), &(), 0, &batch).unwrap().loss;

        let terms = replay_targets(&sde, PrngKey::new(5), &batch);
        let expected_mean = terms
            .iter()
            .map(|(t, target)| sde.beta_t(*t) * target.norm_squared() / 3.0)
            .sum::<f64>()
            / 3.0;
        let expected_half_sum = terms
            .iter()
            .map(|(t, target)| sde.beta_t(*t) * 0.5 * target.norm_squared())
            .sum::<f64>()
            / 3.0;

        assert_relative_eq!(a, expected_mean, max_relative = 1e-10);
        assert_relative_eq!(b, expected_half_sum, max_relative = 1e-10);
        assert_relative_eq!(b, 1.5 * a, max_relative = 1e-10);
    }

    #[test]
    fn test_variance_weighting() {
        let sde = space();
        let model = CountingZeroModel;
        let batch = skewed_batch();
        let config = DsmConfig::new().with_likelihood_weighting(false);
        let loss_fn = DsmLoss::new(&sde, &model, config).unwrap();

        let out = loss_fn.loss(PrngKey::new(13), &(), 0, &batch).unwrap();

        let expected = replay_targets(&sde, PrngKey::new(13), &batch)
            .iter()
            .map(|(t, target)| {
                let (_, std) = sde.marginal_prob(&DVector::zeros(3), *t).unwrap();
                std * std * target.norm_squared() / 3.0
            })
            .sum::<f64>()
            / 3.0;
        assert!(expected > 0.0);
        assert_relative_eq!(out.loss, expected, max_relative = 1e-10);
    }

    #[test]
    fn test_history_anchor_runs() {
        let sde = plane();
        let model = CountingZeroModel;
        let config = DsmConfig::new().with_s_zero(false).with_likelihood_weighting(false);
        let loss_fn = DsmLoss::new(&sde, &model, config).unwrap();

        let out = loss_fn.loss(PrngKey::new(9), &(), 3, &origin_batch(3)).unwrap();
        assert!(out.loss >= 0.0);
        assert_eq!(out.state, 4);
    }
}
