//! Error types for the equilibrium engine
//!
//! Only malformed inputs and strict-mode resource-constraint violations are
//! surfaced as errors. Household and equilibrium infeasibility is encoded as
//! penalties and status flags instead (see [`crate::penalty`]).

use thiserror::Error;

/// Errors returned to callers of the library
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Dimension mismatch for {name}: expected {expected}, found {found}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Resource constraint violated: |Y - (C + I)| = {residual:e} exceeds {tolerance:e}")]
    ResourceConstraint { residual: f64, tolerance: f64 },

    #[error("Could not parse {what} from '{value}'")]
    Parse { what: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn dimension(name: &str, expected: usize, found: usize) -> Self {
        ModelError::DimensionMismatch {
            name: name.to_string(),
            expected,
            found,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
