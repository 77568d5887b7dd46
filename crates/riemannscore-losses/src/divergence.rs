//! Hutchinson trace estimation of a vector field's divergence.
//!
//! For a probe vector ε with E[ε εᵀ] = P,
//!
//! ```text
//! E[ εᵀ (∂f/∂x) ε ] = tr(P ∂f/∂x)
//! ```
//!
//! Probes are projected onto the tangent space at each point, so P is the
//! tangent projector and the estimate is the Riemannian divergence of a
//! tangent field on an embedded manifold. On flat space P = I and this is the
//! ordinary trace of the Jacobian.
//!
//! One probe is drawn per example. The estimate is unbiased; callers wanting
//! lower variance average several independent estimates.

use riemannscore_core::{
    error::{TrainingError, TrainingResult},
    field::VectorField,
    manifold::Manifold,
    random::{rademacher_vector, standard_normal_vector, PrngKey},
    types::{Point, Scalar, TangentVector},
};
use std::fmt;

/// Distribution of the Hutchinson probe vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HutchinsonNoise {
    /// Independent ±1 entries. Lowest-variance choice for most fields.
    #[default]
    Rademacher,
    /// Independent standard normal entries.
    Gaussian,
}

impl fmt::Display for HutchinsonNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HutchinsonNoise::Rademacher => write!(f, "Rademacher"),
            HutchinsonNoise::Gaussian => write!(f, "Gaussian"),
        }
    }
}

/// Single-probe Hutchinson divergence estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HutchinsonEstimator {
    noise: HutchinsonNoise,
}

impl HutchinsonEstimator {
    /// Creates an estimator drawing probes from `noise`.
    pub fn new(noise: HutchinsonNoise) -> Self {
        Self { noise }
    }

    /// The probe distribution.
    pub fn noise(&self) -> HutchinsonNoise {
        self.noise
    }

    /// Draws `n` ambient probes of length `dim` from one key.
    pub fn sample_noise<T: Scalar>(&self, key: PrngKey, n: usize, dim: usize) -> Vec<TangentVector<T>> {
        let mut rng = key.into_rng();
        (0..n)
            .map(|_| match self.noise {
                HutchinsonNoise::Rademacher => rademacher_vector(&mut rng, dim),
                HutchinsonNoise::Gaussian => standard_normal_vector(&mut rng, dim),
            })
            .collect()
    }

    /// Draws one probe per point, projected onto the tangent space there.
    pub fn tangent_noise<T, M>(&self, key: PrngKey, manifold: &M, x: &[Point<T>]) -> TrainingResult<Vec<TangentVector<T>>>
    where
        T: Scalar,
        M: Manifold<T> + ?Sized,
    {
        let dim = manifold.ambient_dimension();
        self.sample_noise(key, x.len(), dim)
            .into_iter()
            .zip(x)
            .map(|(eps, xi)| Ok(manifold.project_tangent(xi, &eps)?))
            .collect()
    }

    /// Computes εᵢᵀ (∂f/∂x)(xᵢ, tᵢ) εᵢ for every example.
    ///
    /// The probes are given explicitly so the same draw can be reused across
    /// the evaluations that make up one estimate.
    pub fn divergence<T, V>(
        &self,
        field: &V,
        x: &[Point<T>],
        t: &[T],
        eps: &[TangentVector<T>],
    ) -> TrainingResult<Vec<T>>
    where
        T: Scalar,
        V: VectorField<T> + ?Sized,
    {
        if eps.len() != x.len() {
            return Err(TrainingError::dimension_mismatch(
                format!("{} probes", x.len()),
                format!("{} probes", eps.len()),
            ));
        }
        let jvp = field.jvp(x, t, eps)?;
        Ok(jvp.iter().zip(eps).map(|(jv, e)| jv.dot(e)).collect())
    }

    /// Draws tangent probes from `key` and estimates the divergence of
    /// `field` at every example.
    pub fn estimate<T, V, M>(
        &self,
        key: PrngKey,
        manifold: &M,
        field: &V,
        x: &[Point<T>],
        t: &[T],
    ) -> TrainingResult<Vec<T>>
    where
        T: Scalar,
        V: VectorField<T> + ?Sized,
        M: Manifold<T> + ?Sized,
    {
        let eps = self.tangent_noise(key, manifold, x)?;
        self.divergence(field, x, t, &eps)
    }
}
