//! Layered error definitions
//!
//! Categorized by source: config / work / io

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unified configuration and IO error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A work function's report that it could not complete its operation on an item
#[derive(Debug, Error)]
#[error("{message}")]
pub struct WorkFailure {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl WorkFailure {
    /// Create a failure from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a failure wrapping an underlying error
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error report: the failure together with the stage that observed it
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {cause}")]
pub struct StageFailure {
    /// Name of the reporting stage
    pub stage: String,
    /// Underlying work failure
    #[source]
    pub cause: WorkFailure,
}

impl StageFailure {
    pub fn new(stage: impl Into<String>, cause: WorkFailure) -> Self {
        Self {
            stage: stage.into(),
            cause,
        }
    }
}
