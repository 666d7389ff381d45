//! Error types for the grantlens-core crate.

use thiserror::Error;

/// Top-level error type for dataset loading and configuration.
///
/// Aggregation itself never fails: empty groups and empty inputs are handled
/// by the guarded denominators in [`crate::stats`].
#[derive(Debug, Error)]
pub enum GrantError {
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Metadata join error: {0}")]
    Join(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl GrantError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn join(msg: impl Into<String>) -> Self {
        Self::Join(msg.into())
    }

    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<figment::Error> for GrantError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = GrantError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GrantError::invalid_record("G00001: probability 1.4 outside [0, 1]");
        assert_eq!(
            err.to_string(),
            "Invalid record: G00001: probability 1.4 outside [0, 1]"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: GrantError = io.into();
        assert!(matches!(err, GrantError::Io(_)));
    }
}
