//! Error types for manifold geometry and score-model training.
//!
//! Geometry backends report [`ManifoldError`]; SDEs, score functions and the
//! loss estimators report [`TrainingError`], which wraps manifold failures.

use thiserror::Error;

/// Errors that can occur during manifold operations.
#[derive(Debug, Clone, Error)]
pub enum ManifoldError {
    /// Point is not on the manifold.
    ///
    /// This error occurs when a point fails to satisfy the manifold constraints
    /// within numerical tolerance.
    #[error("Point is not on the manifold: {reason}")]
    InvalidPoint {
        /// Description of why the point is invalid
        reason: String,
    },

    /// Vector is not in the tangent space.
    #[error("Vector is not in the tangent space: {reason}")]
    InvalidTangent {
        /// Description of why the tangent vector is invalid
        reason: String,
    },

    /// Dimension mismatch between vectors.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Numerical instability detected.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },

    /// Method or feature not implemented.
    ///
    /// Geometry backends return this for capabilities they cannot offer,
    /// e.g. uniform sampling on an unbounded space.
    #[error("Feature not implemented: {feature}")]
    NotImplemented {
        /// Name of the unimplemented feature
        feature: String,
    },
}

impl ManifoldError {
    /// Create an InvalidPoint error with a custom reason.
    pub fn invalid_point<S: Into<String>>(reason: S) -> Self {
        Self::InvalidPoint {
            reason: reason.into(),
        }
    }

    /// Create an InvalidTangent error with a custom reason.
    pub fn invalid_tangent<S: Into<String>>(reason: S) -> Self {
        Self::InvalidTangent {
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Create a NotImplemented error for a specific feature.
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }
}

/// Errors that can occur while building or evaluating SDEs and losses.
#[derive(Debug, Clone, Error)]
pub enum TrainingError {
    /// Batch points do not match the manifold's embedding dimension.
    ///
    /// Raised before any random key is split, so a failing batch never
    /// consumes reproducible random state.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Invalid static configuration of an SDE or loss estimator.
    #[error("Invalid configuration: {reason} ({parameter} = {value})")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// The batch has no data points.
    #[error("Batch is empty")]
    EmptyBatch,

    /// The score model failed to evaluate.
    #[error("Score model failed: {reason}")]
    Model {
        /// Description reported by the model
        reason: String,
    },

    /// Propagated manifold error.
    #[error("Manifold operation failed: {0}")]
    Manifold(#[from] ManifoldError),
}

impl TrainingError {
    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: std::fmt::Display,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a Model error.
    pub fn model<S: Into<String>>(reason: S) -> Self {
        Self::Model {
            reason: reason.into(),
        }
    }
}

/// Result type alias for operations that can produce ManifoldError.
pub type Result<T> = std::result::Result<T, ManifoldError>;

/// Result type alias for SDE and loss operations.
pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ManifoldError::invalid_point("not unit norm");
        assert!(matches!(err, ManifoldError::InvalidPoint { .. }));
        assert_eq!(err.to_string(), "Point is not on the manifold: not unit norm");

        let err = TrainingError::dimension_mismatch(2, 3);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 2, got 3");
    }

    #[test]
    fn test_configuration_error_display() {
        let err = TrainingError::invalid_configuration("t0 + eps must be below tf", "eps", 1.5);
        assert!(matches!(err, TrainingError::InvalidConfiguration { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid configuration: t0 + eps must be below tf (eps = 1.5)"
        );
    }

    #[test]
    fn test_manifold_error_propagation() {
        let manifold_err = ManifoldError::not_implemented("uniform sampling");
        let training_err: TrainingError = manifold_err.into();

        assert!(matches!(training_err, TrainingError::Manifold(_)));
        assert!(training_err.to_string().contains("Manifold operation failed"));
        assert!(training_err.to_string().contains("uniform sampling"));
    }
}
