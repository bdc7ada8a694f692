//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{Pacing, PipelineBlueprint};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Topology info for JSON output
#[derive(Serialize)]
struct TopologyInfo {
    version: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_blocks: Option<u64>,
    generator: GeneratorInfo,
    stages: Vec<StageInfo>,
}

#[derive(Serialize)]
struct GeneratorInfo {
    start_block: u64,
    pacing: Pacing,
}

#[derive(Serialize)]
struct StageInfo {
    name: &'static str,
    config_key: &'static str,
    latency: Pacing,
    #[serde(skip_serializing_if = "Option::is_none")]
    fail_every: Option<u64>,
    last: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;
    let topology = build_topology_info(&blueprint);

    if args.json {
        let json =
            serde_json::to_string_pretty(&topology).context("Failed to serialize topology info")?;
        println!("{}", json);
    } else {
        print_topology_info(&topology);
    }

    Ok(())
}

fn build_topology_info(blueprint: &PipelineBlueprint) -> TopologyInfo {
    let stage_count = block_workers::STAGE_NAMES.len();
    let stages = block_workers::STAGE_NAMES
        .iter()
        .zip(blueprint.stages.iter())
        .enumerate()
        .map(|(i, (&name, (config_key, stage)))| StageInfo {
            name,
            config_key,
            latency: stage.latency,
            fail_every: (stage.fail_every > 0).then_some(stage.fail_every),
            last: i + 1 == stage_count,
        })
        .collect();

    TopologyInfo {
        version: format!("{:?}", blueprint.version),
        queue_capacity: blueprint.pipeline.queue_capacity,
        max_blocks: blueprint.max_blocks(),
        generator: GeneratorInfo {
            start_block: blueprint.generator.start_block,
            pacing: blueprint.generator.pacing,
        },
        stages,
    }
}

fn describe_pacing(pacing: &Pacing) -> String {
    match pacing {
        Pacing::Immediate => "none".to_string(),
        Pacing::Fixed { ms } => format!("{ms} ms"),
        Pacing::Normal { mean_ms, stddev_ms } => format!("~N({mean_ms} ms, {stddev_ms} ms)"),
    }
}

fn print_topology_info(topology: &TopologyInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Block Pipeline Topology                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📦 Generator");
    println!("   ├─ Version: {}", topology.version);
    println!("   ├─ Start block: {}", topology.generator.start_block);
    match topology.max_blocks {
        Some(limit) => println!("   ├─ Max blocks: {limit}"),
        None => println!("   ├─ Max blocks: unbounded"),
    }
    println!("   └─ Pacing: {}", describe_pacing(&topology.generator.pacing));

    println!(
        "\n🔗 Stages ({}, queue capacity {})",
        topology.stages.len(),
        topology.queue_capacity
    );
    for stage in &topology.stages {
        let prefix = if stage.last { "└─" } else { "├─" };
        let failures = match stage.fail_every {
            Some(n) => format!("fails every {n}th block"),
            None => "never fails".to_string(),
        };
        println!(
            "   {} {} [stages.{}] latency {}, {}",
            prefix,
            stage.name,
            stage.config_key,
            describe_pacing(&stage.latency),
            failures
        );
    }

    println!();
}
