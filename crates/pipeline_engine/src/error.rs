//! Pipeline engine error types

use thiserror::Error;

/// Pipeline construction and execution errors
///
/// Stage failures are not errors at this level; they are reported through
/// [`crate::RunOutcome::Failed`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Queue capacity must be at least one
    #[error("invalid queue capacity {capacity}: must be >= 1")]
    InvalidCapacity { capacity: usize },

    /// A pipeline needs at least one stage
    #[error("pipeline has no stages")]
    NoStages,

    /// A pipeline task panicked or was aborted
    #[error("pipeline task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },
}

impl PipelineError {
    pub fn task_failed(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            task: task.into(),
            message: message.into(),
        }
    }
}

/// Pipeline Result type alias
pub type Result<T> = std::result::Result<T, PipelineError>;
