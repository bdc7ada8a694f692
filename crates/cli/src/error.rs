//! Error types for CLI operations.

use contracts::StageFailure;
use thiserror::Error;

/// Exit status for a clean run (drained or interrupted)
pub const EXIT_OK: u8 = 0;
/// Exit status when a stage failure shut the pipeline down
pub const EXIT_STAGE_FAILURE: u8 = 1;
/// Exit status for every other command error
pub const EXIT_ERROR: u8 = 2;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// A stage reported a failure and the pipeline was cancelled
    #[error("Pipeline stopped: {0}")]
    StageFailed(#[from] StageFailure),

    /// Signal handler installation failed
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::StageFailed(_) => EXIT_STAGE_FAILURE,
            _ => EXIT_ERROR,
        }
    }
}

/// Map any command error to a process exit status
pub fn exit_code_for(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<CliError>()
        .map_or(EXIT_ERROR, CliError::exit_code)
}
