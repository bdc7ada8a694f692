//! Pipeline run orchestration for the CLI.

mod runner;
mod shutdown;
mod summary;

pub use runner::{RunConfig, Runner};
pub use summary::{print_summary, render_summary};
