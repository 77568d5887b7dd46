//! RiemannScore SDE - stochastic processes on Riemannian manifolds.
//!
//! This crate provides the forward noising processes used to train
//! score-based generative models on manifolds:
//!
//! - [`Sde`] and [`SdeCoefficients`]: the process contract
//! - [`Brownian`]: Brownian motion with a linear noise schedule
//! - [`ReverseSde`]: Anderson's time reversal driven by a score function
//! - [`EulerMaruyama`]: the integrator used when a manifold has no
//!   closed-form random walk
//! - [`UniformDistribution`]: the tractable base distribution on a compact
//!   manifold
//!
//! # Example
//!
//! ```rust,no_run
//! use riemannscore_core::random::PrngKey;
//! use riemannscore_manifolds::Sphere;
//! use riemannscore_sde::{Brownian, BrownianConfig, Sde};
//! use nalgebra::DVector;
//!
//! let sde = Brownian::new(Sphere::new(3)?, BrownianConfig::<f64>::default())?;
//! let x0 = DVector::from_vec(vec![0.0, 0.0, 1.0]);
//! let xt = sde.marginal_sample(PrngKey::new(0), &x0, 0.5)?;
//! let logp = sde.marginal_log_prob(&x0, &xt, 0.5)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod brownian;
pub mod distribution;
pub mod reverse;
pub mod sde;
pub mod solver;

pub use brownian::{Brownian, BrownianConfig};
pub use distribution::{BaseDistribution, UniformDistribution};
pub use reverse::ReverseSde;
pub use sde::{Diffusion, Sde, SdeCoefficients, Trajectory};
pub use solver::{EulerMaruyama, EulerMaruyamaConfig};
