//! # RiemannScore
//!
//! Training objectives for score-based generative models on Riemannian
//! manifolds.
//!
//! Data living on a curved space (directions on a sphere, rotations,
//! positions on a torus) is noised by a Brownian motion that stays on the
//! manifold. A time-conditioned vector field is trained so that the reversed
//! process, driven by that field, maps noise back to data. This crate gathers
//! the pieces of that pipeline:
//!
//! - **Core** ([`manifold`], [`random`], [`score`], [`batch`], [`error`]):
//!   the manifold capability, PRNG keys, the score-model adapter, batches
//!   and errors
//! - **Manifolds** ([`manifolds`]): flat space and the unit sphere
//! - **SDEs** ([`sde`]): Brownian motion with a linear schedule and its time
//!   reversal
//! - **Losses** ([`losses`]): denoising and implicit score matching, and the
//!   Moser-flow objective
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use riemannscore::prelude::*;
//! use riemannscore_core::test_utils::CountingZeroModel;
//!
//! let sphere = Sphere::new(3)?;
//! let sde = Brownian::new(sphere, BrownianConfig::<f64>::default())?;
//! let model = CountingZeroModel;
//!
//! let loss_fn = IsmLoss::new(&sde, &model, IsmConfig::default())?;
//! let batch = Batch::new(vec![DVector::from_vec(vec![0.0, 0.0, 1.0]); 16]);
//!
//! let mut state = 0;
//! for key in PrngKey::new(0).split_n(10) {
//!     let out = loss_fn.loss(key, &(), state, &batch)?;
//!     state = out.state;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use riemannscore_core::{batch, error, field, manifold, parallel, random, score, types};
#[cfg(feature = "test-utils")]
pub use riemannscore_core::test_utils;

pub use riemannscore_losses as losses;
pub use riemannscore_manifolds as manifolds;
pub use riemannscore_sde as sde;

pub use nalgebra;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use riemannscore::prelude::*;
/// ```
pub mod prelude {
    pub use riemannscore_core::prelude::*;
    pub use riemannscore_losses::{
        DsmConfig, DsmLoss, HutchinsonEstimator, HutchinsonNoise, IsmConfig, IsmLoss, LossFunction,
        LossOutput, MoserConfig, MoserLoss,
    };
    pub use riemannscore_manifolds::{Euclidean, Sphere};
    pub use riemannscore_sde::{
        BaseDistribution, Brownian, BrownianConfig, Diffusion, EulerMaruyama, EulerMaruyamaConfig,
        ReverseSde, Sde, SdeCoefficients, Trajectory, UniformDistribution,
    };
}
