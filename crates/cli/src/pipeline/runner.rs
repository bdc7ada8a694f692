//! Runner - wires process-level cancellation around one block pipeline run.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::PipelineBlueprint;
use pipeline_engine::PipelineReport;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::shutdown::{cancel_after, cancel_on_signal};

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Effective blueprint (file + CLI overrides)
    pub blueprint: PipelineBlueprint,

    /// Cancel the run after this long (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Stop the run on Ctrl+C / SIGTERM
    pub handle_signals: bool,
}

impl RunConfig {
    pub fn new(blueprint: PipelineBlueprint) -> Self {
        Self {
            blueprint,
            timeout: None,
            metrics_port: None,
            handle_signals: true,
        }
    }
}

/// Runs the block pipeline to completion
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run until the pipeline drains, a stage fails, or `cancel` is tripped
    ///
    /// A signal or the timeout cancels `cancel` itself, so the caller can tell
    /// an interrupted run from a failed one through the report outcome.
    #[instrument(
        name = "cli_run",
        skip(self, cancel),
        fields(
            timeout = ?self.config.timeout,
            metrics_port = ?self.config.metrics_port
        )
    )]
    pub async fn run(self, cancel: &CancellationToken) -> Result<PipelineReport> {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let signal_task = self
            .config
            .handle_signals
            .then(|| cancel_on_signal(cancel.clone()));
        let timeout_task = self
            .config
            .timeout
            .map(|after| cancel_after(cancel.clone(), after));

        info!("Starting pipeline...");
        let result = block_workers::start_pipeline(cancel, &self.config.blueprint).await;

        for task in [signal_task, timeout_task].into_iter().flatten() {
            task.abort();
        }

        result.context("Pipeline execution failed")
    }
}
