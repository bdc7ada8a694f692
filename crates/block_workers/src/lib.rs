//! # Block Workers
//!
//! The block pipeline: simulated fetch / transform / store work functions and
//! the fixed topology that chains them.
//!
//! Responsibilities:
//! - Simulate per-block latency (cancellable)
//! - Inject input-dependent failures (`block % fail_every == 0`)
//! - Assemble `Fetch Blocks -> Transform Blocks -> Store Results` over `BlockId`
//!
//! ## Usage Example
//!
//! ```ignore
//! use block_workers::start_pipeline;
//! use contracts::{CancellationToken, PipelineBlueprint};
//!
//! let cancel = CancellationToken::new();
//! let report = start_pipeline(&cancel, &PipelineBlueprint::default()).await?;
//! ```

mod topology;
mod workers;

// Re-exports
pub use topology::{block_pipeline, start_pipeline, STAGE_NAMES};
pub use workers::{FetchBlocks, StoreResults, TransformBlocks};
