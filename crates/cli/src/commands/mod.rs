//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::PipelineBlueprint;
use tracing::info;

use crate::cli::DEFAULT_CONFIG;
use crate::error::CliError;

/// Load a blueprint, falling back to built-in defaults when the default path is absent
fn load_blueprint(path: &Path) -> Result<PipelineBlueprint> {
    if !path.exists() {
        if path == Path::new(DEFAULT_CONFIG) {
            info!(
                config = %path.display(),
                "No configuration file, using built-in defaults"
            );
            return Ok(PipelineBlueprint::default());
        }
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
