//! # Pipeline Engine
//!
//! Staged concurrent processing engine.
//!
//! Responsibilities:
//! - Run each stage as an independent task between two bounded queues
//! - Feed the first queue from a paced, cancellable generator
//! - Escalate the first stage failure into pipeline-wide cancellation
//! - Wait for every task before reporting how the run ended
//!
//! ## Data flow
//!
//! ```text
//! Generator -> q1 -> Stage1 -> q2 -> Stage2 -> ... -> StageN -> qN+1 (output)
//!                      \          \                    \
//!                       +----------+-- errors (cap 1) --+--> Supervisor -> cancel
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{from_fn, CancellationToken, Pacing};
//! use pipeline_engine::PipelineBuilder;
//!
//! let pipeline = PipelineBuilder::new(10)
//!     .stage("Parse", from_fn(|_: &u64| Ok(())))
//!     .stage("Store", from_fn(|_: &u64| Ok(())))
//!     .build(1u64.., Pacing::Immediate)?;
//!
//! let report = pipeline.run(&CancellationToken::new()).await?;
//! ```

mod error;
mod generator;
mod metrics;
mod pipeline;
mod stage;
mod supervisor;

// Re-exports
pub use contracts::{CancellationToken, StageFailure, WorkFailure, Worker};
pub use error::{PipelineError, Result};
pub use generator::Generator;
pub use metrics::{StageMetrics, StageSnapshot};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineReport, RunOutcome};
pub use stage::{Stage, StageExit, StageHandle};
pub use supervisor::Supervisor;
pub use tokio_util::task::TaskTracker;
