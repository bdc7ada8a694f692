//! Configuration validation
//!
//! Rules:
//! - queue_capacity >= 1
//! - start_block >= 1
//! - normal pacing: mean_ms >= 0, stddev_ms >= 0, both finite
//! - the last bounded block (start_block + max_blocks - 1) fits in u64

use contracts::{ContractError, PipelineBlueprint};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a PipelineBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| ("<root>".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })?;
    validate_block_range(blueprint)?;
    Ok(())
}

/// Check the generated block range fits in u64
fn validate_block_range(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let start = blueprint.generator.start_block;
    let count = blueprint.pipeline.max_blocks;
    if start.checked_add(count.saturating_sub(1)).is_none() {
        return Err(ContractError::config_validation(
            "generator.start_block / pipeline.max_blocks",
            format!("block range {start} + {count} overflows"),
        ));
    }
    Ok(())
}

/// Flatten nested validator errors into a dotted field path and message
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                if let Some(err) = field_errors.first() {
                    let message = match &err.message {
                        Some(message) => message.to_string(),
                        None => match err.params.get("value") {
                            Some(value) => format!("failed '{}' check, got {value}", err.code),
                            None => format!("failed '{}' check", err.code),
                        },
                    };
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}
