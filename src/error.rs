//! Error types for refshelf.
//!
//! Lookups of unknown references and blank queries are not errors: they come
//! back as `None` or an empty list. Only genuine failures (storage, config,
//! malformed caller input) surface as [`ShelfError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("missing config: {0}")]
    MissingConfig(String),

    /// Caller input that can never succeed (bad identifier list, bad page
    /// range, zero-length vector). Distinct from an empty result.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),
}

impl ShelfError {
    /// Short machine-readable code used by robot output and tool errors.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Io(_) => "io",
            Self::Json(_) | Self::Serialization(_) => "serialization",
            Self::Config(_) | Self::MissingConfig(_) => "config",
            Self::MalformedInput(_) => "malformed_input",
            Self::NotFound(_) => "not_found",
            Self::ValidationFailed(_) => "validation_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ShelfError::MalformedInput("x".to_string()).code(),
            "malformed_input"
        );
        assert_eq!(ShelfError::Config("x".to_string()).code(), "config");
        assert_eq!(ShelfError::MissingConfig("x".to_string()).code(), "config");
    }

    #[test]
    fn test_sqlite_error_converts() {
        let err: ShelfError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, ShelfError::Database(_)));
        assert!(err.to_string().starts_with("database error"));
    }
}
