//! Type definitions and aliases for score-based modelling on manifolds.
//!
//! This module provides the scalar trait shared by every crate in the
//! workspace, vector aliases for points and tangent vectors, and the
//! numerical constants the estimators rely on.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used by SDEs and loss estimators (f32 or f64).
///
/// This trait combines all the numeric traits required to run manifold
/// geometry, random sampling and the loss reductions generically.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Relative step used by central finite-difference directional derivatives.
    ///
    /// Chosen close to `EPSILON^(1/3)`, which balances truncation and
    /// rounding error for a central difference.
    const FD_STEP: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Convert from usize (for batch sizes and step counts).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const FD_STEP: Self = 5e-3;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const FD_STEP: Self = 6e-6;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// A point on a manifold, stored in its embedding coordinates.
pub type Point<T> = DVector<T>;

/// A tangent vector, stored in the same embedding coordinates as its base point.
pub type TangentVector<T> = DVector<T>;

/// Numerical constants for different precision levels.
pub mod constants {
    use super::Scalar;

    /// Pi constant.
    pub fn pi<T: Scalar>() -> T {
        <T as Scalar>::from_f64(std::f64::consts::PI)
    }

    /// 2π, the circumference of the unit circle.
    pub fn tau<T: Scalar>() -> T {
        <T as Scalar>::from_f64(std::f64::consts::TAU)
    }
}
