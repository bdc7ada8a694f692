//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::PipelineBlueprint;
use pipeline_engine::RunOutcome;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{print_summary, RunConfig, Runner};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        queue_capacity = blueprint.pipeline.queue_capacity,
        max_blocks = ?blueprint.max_blocks(),
        start_block = blueprint.generator.start_block,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let config = RunConfig {
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        ..RunConfig::new(blueprint)
    };

    let cancel = CancellationToken::new();
    let report = Runner::new(config).run(&cancel).await?;

    info!(
        outcome = report.outcome.label(),
        blocks_generated = report.items_generated,
        duration_secs = report.duration.as_secs_f64(),
        throughput = format!("{:.2}", report.throughput()),
        "Pipeline finished"
    );
    print_summary(&report);

    match report.outcome {
        RunOutcome::Drained => info!("All blocks processed"),
        RunOutcome::Cancelled => warn!("Pipeline interrupted before draining"),
        RunOutcome::Failed(failure) => {
            return Err(CliError::from(failure)).context("Pipeline execution failed");
        }
    }

    info!("Block pipeline finished");
    Ok(())
}

/// Apply CLI overrides on top of the loaded blueprint
fn apply_overrides(blueprint: &mut PipelineBlueprint, args: &RunArgs) {
    if let Some(capacity) = args.queue_capacity {
        info!(queue_capacity = capacity, "Overriding queue capacity from CLI");
        blueprint.pipeline.queue_capacity = capacity;
    }
    if let Some(max_blocks) = args.max_blocks {
        info!(max_blocks, "Overriding block limit from CLI");
        blueprint.pipeline.max_blocks = max_blocks;
    }
    if args.fast {
        info!("Fast mode - simulated latency disabled");
        *blueprint = std::mem::take(blueprint).without_delays();
    }
    if args.no_failures {
        info!("Failure injection disabled");
        *blueprint = std::mem::take(blueprint).without_failures();
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &PipelineBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Pipeline:");
    println!("  Queue capacity: {}", blueprint.pipeline.queue_capacity);
    match blueprint.max_blocks() {
        Some(limit) => println!("  Max blocks: {limit}"),
        None => println!("  Max blocks: unbounded"),
    }
    println!("\nGenerator:");
    println!("  Start block: {}", blueprint.generator.start_block);
    println!("  Pacing: {:?}", blueprint.generator.pacing);

    println!("\nStages:");
    for (name, stage) in blueprint.stages.iter() {
        println!(
            "  - {} (latency {:?}, fail_every {})",
            name, stage.latency, stage.fail_every
        );
    }

    println!();
}
