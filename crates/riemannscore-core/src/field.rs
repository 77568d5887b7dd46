//! Batched, time-dependent vector fields and their directional derivatives.
//!
//! Divergence estimation only ever needs Jacobian-vector products, so this is
//! the one differentiation primitive the workspace defines. Fields with an
//! analytic Jacobian override [`VectorField::jvp`]; everything else falls back
//! to a central finite difference in the embedding coordinates.

use crate::{
    error::{TrainingError, TrainingResult},
    types::{Point, Scalar, TangentVector},
};
use num_traits::Float;

/// A vector field evaluated on a batch of points and times.
pub trait VectorField<T: Scalar> {
    /// Evaluates the field at every `(x[i], t[i])`.
    fn eval(&self, x: &[Point<T>], t: &[T]) -> TrainingResult<Vec<TangentVector<T>>>;

    /// Jacobian-vector products (∂f/∂x)(x[i], t[i]) · v[i].
    fn jvp(
        &self,
        x: &[Point<T>],
        t: &[T],
        v: &[TangentVector<T>],
    ) -> TrainingResult<Vec<TangentVector<T>>> {
        central_difference_jvp(self, x, t, v)
    }
}

/// Adapter turning a closure into a [`VectorField`].
pub struct FnField<F>(pub F);

impl<T, F> VectorField<T> for FnField<F>
where
    T: Scalar,
    F: Fn(&[Point<T>], &[T]) -> TrainingResult<Vec<TangentVector<T>>>,
{
    fn eval(&self, x: &[Point<T>], t: &[T]) -> TrainingResult<Vec<TangentVector<T>>> {
        (self.0)(x, t)
    }
}

/// Central finite-difference Jacobian-vector products.
///
/// The step for example `i` is `FD_STEP * max(1, ‖x[i]‖)`.
pub fn central_difference_jvp<T, F>(
    field: &F,
    x: &[Point<T>],
    t: &[T],
    v: &[TangentVector<T>],
) -> TrainingResult<Vec<TangentVector<T>>>
where
    T: Scalar,
    F: VectorField<T> + ?Sized,
{
    if x.len() != v.len() || x.len() != t.len() {
        return Err(TrainingError::dimension_mismatch(
            format!("{} points, times and directions", x.len()),
            format!("{} times and {} directions", t.len(), v.len()),
        ));
    }

    let steps: Vec<T> = x
        .iter()
        .map(|xi| T::FD_STEP * <T as Float>::max(T::one(), xi.norm()))
        .collect();
    let plus: Vec<Point<T>> = x
        .iter()
        .zip(v)
        .zip(&steps)
        .map(|((xi, vi), &h)| xi + vi * h)
        .collect();
    let minus: Vec<Point<T>> = x
        .iter()
        .zip(v)
        .zip(&steps)
        .map(|((xi, vi), &h)| xi - vi * h)
        .collect();

    let f_plus = field.eval(&plus, t)?;
    let f_minus = field.eval(&minus, t)?;
    let two = <T as Scalar>::from_f64(2.0);

    Ok(f_plus
        .iter()
        .zip(&f_minus)
        .zip(&steps)
        .map(|((fp, fm), &h)| (fp - fm) / (two * h))
        .collect())
}
