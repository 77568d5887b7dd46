//! The loss-function contract and helpers shared by the estimators.

use num_traits::Float;
use riemannscore_core::{
    batch::Batch,
    error::{TrainingError, TrainingResult},
    random::{uniform_scalars, PrngKey},
    score::ScoreModel,
    types::Scalar,
};
use tracing::{trace, warn};

/// A scalar loss together with the model state to carry forward.
#[derive(Debug, Clone, PartialEq)]
pub struct LossOutput<T: Scalar, S> {
    /// Batch-reduced loss. May be non-finite; it is never clipped.
    pub loss: T,
    /// Model state after evaluation.
    pub state: S,
}

/// A training objective `(key, params, state, batch) -> (loss, new_state)`.
///
/// Implementations are pure given their inputs: the same key, parameters,
/// state and batch always produce the same output.
pub trait LossFunction<T: Scalar, Mod: ScoreModel<T>> {
    /// Evaluates the loss.
    ///
    /// # Errors
    /// Returns `EmptyBatch` or `DimensionMismatch` if the batch does not fit
    /// the manifold; no randomness is consumed in that case.
    fn loss(
        &self,
        key: PrngKey,
        params: &Mod::Params,
        state: Mod::State,
        batch: &Batch<T>,
    ) -> TrainingResult<LossOutput<T, Mod::State>>;
}

/// Checks that `[t0 + eps, tf]` is a non-empty sampling interval.
pub(crate) fn validate_time_floor<T: Scalar>(t0: T, tf: T, eps: T) -> TrainingResult<()> {
    if !<T as Float>::is_finite(eps) || eps < T::zero() {
        return Err(TrainingError::invalid_configuration(
            "time floor must be non-negative and finite",
            "eps",
            eps,
        ));
    }
    if t0 + eps >= tf {
        return Err(TrainingError::invalid_configuration(
            format!("time floor leaves an empty sampling interval [{}, {}]", t0 + eps, tf),
            "eps",
            eps,
        ));
    }
    Ok(())
}

/// Draws one time per example from `Uniform(t0 + eps, tf)`.
pub(crate) fn sample_times<T: Scalar>(key: PrngKey, n: usize, t0: T, tf: T, eps: T) -> Vec<T> {
    uniform_scalars(key, n, t0 + eps, tf)
}

/// Mean of per-example losses.
pub(crate) fn mean<T: Scalar>(values: &[T]) -> T {
    let total = values.iter().fold(T::zero(), |acc, v| acc + *v);
    total / <T as Scalar>::from_usize(values.len().max(1))
}

/// Emits the per-evaluation trace event and flags non-finite values.
pub(crate) fn report<T: Scalar>(objective: &'static str, batch_size: usize, loss: T) {
    if <T as Float>::is_finite(loss) {
        trace!(objective, batch_size, loss = ?loss, "loss evaluated");
    } else {
        warn!(objective, batch_size, loss = ?loss, "non-finite loss");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_floor_validation() {
        assert!(validate_time_floor(0.0, 1.0, 1e-3).is_ok());
        assert!(validate_time_floor(0.0, 1.0, 0.0).is_ok());
        assert!(matches!(
            validate_time_floor(0.0, 1.0, 1.0),
            Err(TrainingError::InvalidConfiguration { .. })
        ));
        assert!(validate_time_floor(0.0, 1.0, -1e-3).is_err());
        assert!(validate_time_floor(0.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_sampled_times_in_range() {
        let times = sample_times(PrngKey::new(0), 500, 0.0, 1.0, 0.25);
        assert_eq!(times.len(), 500);
        assert!(times.iter().all(|t| *t >= 0.25 && *t <= 1.0));
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 6.0]), 3.0);
    }
}
