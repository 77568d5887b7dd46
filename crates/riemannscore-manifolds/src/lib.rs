//! RiemannScore Manifolds - geometry backends for score-based models.
//!
//! This crate provides implementations of the manifold capability consumed by
//! the SDEs and loss estimators: a flat space with closed-form transitions and
//! a curved compact space that requires numerical integration.

pub mod euclidean;
pub mod sphere;

// Re-export main manifolds for convenience
pub use euclidean::Euclidean;
pub use sphere::Sphere;
