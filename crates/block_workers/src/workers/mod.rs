//! Simulated block work functions

#[macro_use]
mod macros;

mod fetch;
mod store;
mod transform;

pub use fetch::FetchBlocks;
pub use store::StoreResults;
pub use transform::TransformBlocks;
