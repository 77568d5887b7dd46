//! RiemannScore Losses - training objectives for manifold generative models.
//!
//! This crate turns a batch of manifold-valued data into a scalar training
//! signal for a score or drift model:
//!
//! - [`DsmLoss`]: denoising score matching against the transition kernel's
//!   score
//! - [`IsmLoss`]: implicit score matching through a Hutchinson divergence
//! - [`MoserLoss`]: a Moser-flow density objective with a negative-mass
//!   penalty
//!
//! Every loss implements [`LossFunction`] and returns the model state to
//! thread into the next call alongside the loss.
//!
//! # Example
//!
//! ```rust,no_run
//! use riemannscore_core::{batch::Batch, random::PrngKey, test_utils::CountingZeroModel};
//! use riemannscore_losses::{DsmConfig, DsmLoss, LossFunction};
//! use riemannscore_manifolds::Sphere;
//! use riemannscore_sde::{Brownian, BrownianConfig};
//! use nalgebra::DVector;
//!
//! let sde = Brownian::new(Sphere::new(3)?, BrownianConfig::<f64>::default())?;
//! let model = CountingZeroModel;
//! let loss_fn = DsmLoss::new(&sde, &model, DsmConfig::default())?;
//!
//! let batch = Batch::new(vec![DVector::from_vec(vec![0.0, 0.0, 1.0]); 8]);
//! let out = loss_fn.loss(PrngKey::new(0), &(), 0, &batch)?;
//! println!("loss = {}, state = {}", out.loss, out.state);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod divergence;
pub mod dsm;
pub mod ism;
pub mod loss;
pub mod moser;

pub use divergence::{HutchinsonEstimator, HutchinsonNoise};
pub use dsm::{DsmConfig, DsmLoss};
pub use ism::{IsmConfig, IsmLoss};
pub use loss::{LossFunction, LossOutput};
pub use moser::{split_density, MoserConfig, MoserLoss};
