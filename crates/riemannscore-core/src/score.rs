//! Score models and the score-function adapter.
//!
//! A [`ScoreModel`] is a parametrized network `(params, state, x, t) ->
//! (vectors, new_state)`. The model never owns its parameters or auxiliary
//! state: both are passed in, and the updated state (e.g. running
//! normalization statistics) is handed back for the caller to thread forward.
//!
//! [`ScoreFunction`] binds a model, a parameter set, a state value and a
//! train flag to a manifold, and projects the model output onto the tangent
//! space at each input point.

use crate::{
    error::{TrainingError, TrainingResult},
    field::VectorField,
    manifold::Manifold,
    random::{FrozenKey, PrngKey},
    types::{Point, Scalar, TangentVector},
};

/// A parametrized, time-conditioned vector-field model.
pub trait ScoreModel<T: Scalar>: Send + Sync {
    /// Trainable parameters.
    type Params: Sync;

    /// Auxiliary, non-trainable state threaded through every call.
    type State: Clone + Send + Sync;

    /// Evaluates the model on a batch of points and times.
    ///
    /// Must not mutate `params`; the returned state replaces `state` for the
    /// next call.
    fn apply(
        &self,
        params: &Self::Params,
        state: &Self::State,
        x: &[Point<T>],
        t: &[T],
        key: PrngKey,
        train: bool,
    ) -> TrainingResult<(Vec<TangentVector<T>>, Self::State)>;
}

/// Output of one score-function evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutput<T: Scalar, S> {
    /// Tangent vectors, one per input point.
    pub scores: Vec<TangentVector<T>>,
    /// Model state after the call.
    pub state: S,
}

/// A model bound to its parameters, state and manifold.
pub struct ScoreFunction<'a, T, Man, Mod>
where
    T: Scalar,
    Man: Manifold<T> + ?Sized,
    Mod: ScoreModel<T>,
{
    manifold: &'a Man,
    model: &'a Mod,
    params: &'a Mod::Params,
    state: Mod::State,
    train: bool,
}

impl<'a, T, Man, Mod> ScoreFunction<'a, T, Man, Mod>
where
    T: Scalar,
    Man: Manifold<T> + ?Sized,
    Mod: ScoreModel<T>,
{
    /// Binds `model` with `params` and `state` on `manifold`.
    pub fn new(
        manifold: &'a Man,
        model: &'a Mod,
        params: &'a Mod::Params,
        state: Mod::State,
        train: bool,
    ) -> Self {
        Self {
            manifold,
            model,
            params,
            state,
            train,
        }
    }

    /// The bound state.
    pub fn state(&self) -> &Mod::State {
        &self.state
    }

    /// Evaluates the score at every `(x[i], t[i])`.
    pub fn call(
        &self,
        x: &[Point<T>],
        t: &[T],
        key: PrngKey,
    ) -> TrainingResult<ScoreOutput<T, Mod::State>> {
        let (raw, state) = self
            .model
            .apply(self.params, &self.state, x, t, key, self.train)?;
        let scores = self.project_outputs(x, raw)?;
        Ok(ScoreOutput { scores, state })
    }

    /// Views the score as a deterministic vector field by replaying `key` on
    /// every evaluation.
    pub fn frozen_field(&self, key: FrozenKey) -> FrozenScoreField<'_, 'a, T, Man, Mod> {
        FrozenScoreField { score: self, key }
    }

    fn project_outputs(
        &self,
        x: &[Point<T>],
        raw: Vec<TangentVector<T>>,
    ) -> TrainingResult<Vec<TangentVector<T>>> {
        if raw.len() != x.len() {
            return Err(TrainingError::model(format!(
                "returned {} vectors for {} points",
                raw.len(),
                x.len()
            )));
        }
        x.iter()
            .zip(raw)
            .map(|(xi, vi)| {
                if vi.len() != xi.len() {
                    return Err(TrainingError::model(format!(
                        "returned a vector of length {} for a point of length {}",
                        vi.len(),
                        xi.len()
                    )));
                }
                Ok(self.manifold.project_tangent(xi, &vi)?)
            })
            .collect()
    }
}

/// A [`ScoreFunction`] with its randomness held fixed.
pub struct FrozenScoreField<'s, 'a, T, Man, Mod>
where
    T: Scalar,
    Man: Manifold<T> + ?Sized,
    Mod: ScoreModel<T>,
{
    score: &'s ScoreFunction<'a, T, Man, Mod>,
    key: FrozenKey,
}

impl<T, Man, Mod> VectorField<T> for FrozenScoreField<'_, '_, T, Man, Mod>
where
    T: Scalar,
    Man: Manifold<T> + ?Sized,
    Mod: ScoreModel<T>,
{
    fn eval(&self, x: &[Point<T>], t: &[T]) -> TrainingResult<Vec<TangentVector<T>>> {
        self.score.call(x, t, self.key.thaw()).map(|out| out.scores)
    }
}
