//! Error types for Synheart Wellness

use thiserror::Error;

/// Errors that can occur while scoring entries or assembling an assessment
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(#[from] CollaboratorError),

    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// True when the caller sent something the engine rejects (4xx-equivalent).
    ///
    /// Everything else is a downstream or internal failure (5xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidInput { .. } | EngineError::JsonError(_)
        )
    }
}

/// Failures reported by external collaborators (record store, text analysis)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{0} timed out")]
    Timeout(String),

    #[error("{0} is unreachable")]
    Unreachable(String),

    #[error("{0} returned an unusable response: {1}")]
    BadResponse(String, String),
}

/// Errors raised while loading or validating engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid config value for {0}: {1}")]
    Invalid(&'static str, String),
}
