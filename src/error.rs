//! Error types for sparse-fcnn operations.
//!
//! Provides rich error context for library consumers.

use thiserror::Error;

/// Main error type for projection, masking and training.
///
/// Configuration and numeric-domain failures (bad radius, NaN weights,
/// shape mismatches) fail fast. Divergence is reported per fold so that a
/// caller running several folds can keep the others.
///
/// # Examples
///
/// ```
/// use sparse_fcnn::error::SparseError;
///
/// let err = SparseError::DimensionMismatch {
///     expected: "50x1".to_string(),
///     actual: "49x1".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SparseError {
    /// Projection radius was zero, negative or non-finite.
    #[error("Invalid projection radius: {radius}, expected a finite value > 0")]
    InvalidRadius {
        /// Offending radius
        radius: f32,
    },

    /// NaN or infinity found where finite values are required.
    #[error("Non-finite value in {context}")]
    NonFinite {
        /// Where the value was found
        context: String,
    },

    /// Matrix/vector dimensions don't match for the operation.
    #[error("Matrix dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Training loss became non-finite.
    #[error("Training diverged in phase {phase} at epoch {epoch}: loss = {loss}")]
    Divergence {
        /// Phase label ("A" or "B")
        phase: String,
        /// Zero-based epoch inside the phase
        epoch: usize,
        /// Offending batch loss
        loss: f64,
    },

    /// An operation received no data.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Configuration document could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation was called out of order (e.g. backward before forward).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A serialized model could not be read or written.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SparseError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create a shape mismatch error from two `(rows, cols)` pairs
    #[must_use]
    pub fn shape_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::DimensionMismatch {
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::EmptyInput(context.to_string())
    }

    /// Create a non-finite value error
    #[must_use]
    pub fn non_finite(context: &str) -> Self {
        Self::NonFinite {
            context: context.to_string(),
        }
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_hyperparameter(param: &str, value: impl ToString, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Whether the error is the per-fold divergence signal.
    #[must_use]
    pub fn is_divergence(&self) -> bool {
        matches!(self, Self::Divergence { .. })
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, SparseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = SparseError::DimensionMismatch {
            expected: "100x10".to_string(),
            actual: "100x5".to_string(),
        };
        assert!(err.to_string().contains("dimension mismatch"));
        assert!(err.to_string().contains("100x10"));
        assert!(err.to_string().contains("100x5"));
    }

    #[test]
    fn test_invalid_radius_display() {
        let err = SparseError::InvalidRadius { radius: -1.0 };
        assert!(err.to_string().contains("radius"));
        assert!(err.to_string().contains("-1"));
    }

    #[test]
    fn test_divergence_display() {
        let err = SparseError::Divergence {
            phase: "B".to_string(),
            epoch: 3,
            loss: f64::NAN,
        };
        let msg = err.to_string();
        assert!(msg.contains("diverged"));
        assert!(msg.contains("phase B"));
        assert!(msg.contains("epoch 3"));
        assert!(err.is_divergence());
    }

    #[test]
    fn test_invalid_hyperparameter_display() {
        let err = SparseError::invalid_hyperparameter("learning_rate", -0.1, "> 0");
        assert!(err.to_string().contains("Invalid hyperparameter"));
        assert!(err.to_string().contains("learning_rate"));
        assert!(err.to_string().contains("-0.1"));
        assert!(!err.is_divergence());
    }

    #[test]
    fn test_helpers() {
        let err = SparseError::dimension_mismatch("labels", 50, 49);
        assert!(err.to_string().contains("labels=50"));

        let err = SparseError::shape_mismatch((3, 2), (2, 3));
        assert!(err.to_string().contains("3x2"));

        let err = SparseError::empty_input("training data");
        assert!(err.to_string().contains("empty input: training data"));

        let err = SparseError::non_finite("weight matrix");
        assert!(err.to_string().contains("weight matrix"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SparseError>();
    }
}
