//! Block Pipeline Demo
//!
//! Runs the fetch -> transform -> store pipeline with shortened latencies
//! until the first injected failure stops it (or Ctrl+C).
//!
//! Run with: cargo run -p demos --bin block_pipeline_demo [config_path]

use std::path::PathBuf;

use config_loader::ConfigLoader;
use contracts::{CancellationToken, Pacing, PipelineBlueprint};
use observability::{LogFormat, ObservabilityConfig};
use pipeline_engine::RunOutcome;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs only, no metrics endpoint
    observability::init_with_config(ObservabilityConfig {
        log_format: LogFormat::Pretty,
        metrics_port: None,
        ..ObservabilityConfig::default()
    })?;

    info!("Starting Block Pipeline Demo");

    let blueprint = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!(path = %path.display(), "Loading config file");
            ConfigLoader::load_from_path(&path)?
        }
        None => demo_blueprint(),
    };
    info!("Blueprint:\n{}", ConfigLoader::to_toml(&blueprint)?);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received, cancelling");
                cancel.cancel();
            }
        }
    });

    let report = block_workers::start_pipeline(&cancel, &blueprint).await?;

    match &report.outcome {
        RunOutcome::Failed(failure) => warn!(%failure, "Demo stopped on stage failure"),
        outcome => info!(outcome = outcome.label(), "Demo finished"),
    }
    for stage in &report.stages {
        info!(
            stage = %stage.name,
            received = stage.received,
            forwarded = stage.forwarded,
            failed = stage.failed,
            mean_latency_ms = format!("{:.1}", stage.latency_ms.mean),
            "Stage summary"
        );
    }
    info!(
        generated = report.items_generated,
        throughput = format!("{:.2}", report.throughput()),
        "=== Demo Complete ==="
    );

    Ok(())
}

/// Stock topology scaled down 20x so a failure shows up within a few seconds
fn demo_blueprint() -> PipelineBlueprint {
    let mut bp = PipelineBlueprint::default();
    bp.generator.pacing = Pacing::normal(200.0, 50.0);
    bp.stages.fetch.latency = Pacing::normal(200.0, 50.0);
    bp.stages.transform.latency = Pacing::normal(100.0, 25.0);
    bp.stages.store.latency = Pacing::normal(10.0, 2.5);
    bp
}
