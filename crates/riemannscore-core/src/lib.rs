//! Core traits and types for Riemannian score-based generative models.
//!
//! This crate provides the foundations shared by the SDEs and loss
//! estimators: the geometry capability a manifold must offer, explicit
//! random keys, score models with explicitly threaded state, and the
//! Jacobian-vector-product primitive used for divergence estimation.
//!
//! # Key Concepts
//!
//! - **Manifold capability**: local geometry, heat kernel and volume
//! - **Keys**: move-only, splittable randomness with no global seed
//! - **Score functions**: models bound to parameters, returning new state
//! - **Vector fields**: batched fields with directional derivatives
//!
//! # Modules
//!
//! - [`batch`]: Training batches and their validation
//! - [`error`]: Error types for geometry and training
//! - [`field`]: Vector fields and Jacobian-vector products
//! - [`manifold`]: The manifold capability trait
//! - [`parallel`]: Per-example mapping with optional Rayon parallelism
//! - [`random`]: Splittable random keys and samplers
//! - [`score`]: Score models and the score-function adapter
//! - [`types`]: Scalar trait, aliases and constants

pub mod batch;
pub mod error;
pub mod field;
pub mod manifold;
pub mod parallel;
pub mod random;
pub mod score;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used items at the crate root
pub use error::{ManifoldError, Result, TrainingError, TrainingResult};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use riemannscore_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::batch::Batch;
    pub use crate::error::{ManifoldError, Result, TrainingError, TrainingResult};
    pub use crate::field::{central_difference_jvp, FnField, VectorField};
    pub use crate::manifold::{Manifold, RandomWalk};
    pub use crate::parallel::{map_examples, ParallelConfig};
    pub use crate::random::{FrozenKey, PrngKey};
    pub use crate::score::{FrozenScoreField, ScoreFunction, ScoreModel, ScoreOutput};
    pub use crate::types::{constants, DMatrix, DVector, Point, Scalar, TangentVector};
}
