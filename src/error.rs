//! Error types for the modelsieve harness

use thiserror::Error;

/// Result type alias for modelsieve operations
pub type Result<T> = std::result::Result<T, SieveError>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A candidate's fit or predict step failed. Fatal to the whole
    /// selection run; no partial outcome is produced.
    #[error("Training failed for candidate '{candidate}': {reason}")]
    TrainingError { candidate: String, reason: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<polars::error::PolarsError> for SieveError {
    fn from(err: polars::error::PolarsError) -> Self {
        SieveError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SieveError {
    fn from(err: serde_json::Error) -> Self {
        SieveError::DataError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SieveError {
    fn from(err: ndarray::ShapeError) -> Self {
        SieveError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SieveError::ConfigError("test proportion out of range".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: test proportion out of range"
        );
    }

    #[test]
    fn test_training_error_names_candidate() {
        let err = SieveError::TrainingError {
            candidate: "LogisticRegression".to_string(),
            reason: "feature count mismatch".to_string(),
        };
        let msg = err.to_string();
        assert!(
            msg.contains("LogisticRegression"),
            "message should name the failing candidate: {msg}"
        );
    }
}
