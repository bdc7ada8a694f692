//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Work model
//! - A pipeline is generic over one item type, fixed per pipeline instance
//! - Work functions implement [`Worker`] and receive the run's cancellation token
//! - The block pipeline transports [`BlockId`] values

mod block;
mod blueprint;
mod error;
mod pacing;
mod work;

pub use block::*;
pub use blueprint::*;
pub use error::*;
pub use pacing::*;
pub use work::*;

pub use tokio_util::sync::CancellationToken;
