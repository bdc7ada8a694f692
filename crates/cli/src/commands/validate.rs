//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{Pacing, PipelineBlueprint};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    queue_capacity: usize,
    max_blocks: Option<u64>,
    start_block: u64,
    stage_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    match result.error {
        None => Ok(()),
        Some(message) => Err(CliError::config_validation(message).into()),
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_blueprint(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    queue_capacity: blueprint.pipeline.queue_capacity,
                    max_blocks: blueprint.max_blocks(),
                    start_block: blueprint.generator.start_block,
                    stage_count: blueprint.stages.iter().count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("{e:#}")),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &PipelineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let injects_failures = blueprint.stages.iter().any(|(_, s)| s.fail_every > 0);

    if blueprint.max_blocks().is_none() && !injects_failures {
        warnings.push(
            "max_blocks is 0 and no stage injects failures - the pipeline only stops on interrupt"
                .to_string(),
        );
    }

    if blueprint.max_blocks().is_none() && blueprint.generator.pacing == Pacing::Immediate {
        warnings.push(
            "unbounded generator without pacing - blocks are produced as fast as stages accept them"
                .to_string(),
        );
    }

    for (name, stage) in blueprint.stages.iter() {
        if stage.fail_every == 1 {
            warnings.push(format!("stages.{name}.fail_every is 1 - every block fails"));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Queue capacity: {}", summary.queue_capacity);
            match summary.max_blocks {
                Some(limit) => println!("  Max blocks: {limit}"),
                None => println!("  Max blocks: unbounded"),
            }
            println!("  Start block: {}", summary.start_block);
            println!("  Stages: {}", summary.stage_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
