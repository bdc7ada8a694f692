//! PipelineBlueprint - Config Loader output
//!
//! Describes one block pipeline run: queue sizing, the block generator and the
//! three fixed stages. Every section defaults to the stock pipeline values, so an
//! empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::Pacing;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete pipeline configuration blueprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineBlueprint {
    /// Configuration version
    pub version: ConfigVersion,

    /// Queue sizing and run bounds
    #[validate(nested)]
    pub pipeline: PipelineSettings,

    /// Block generator
    #[validate(nested)]
    pub generator: GeneratorConfig,

    /// Per-stage work function tuning
    #[validate(nested)]
    pub stages: StagesConfig,
}

/// Queue sizing and run bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineSettings {
    /// Capacity of every inter-stage queue, must be >= 1
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Number of blocks to generate (0 = unbounded)
    pub max_blocks: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            max_blocks: 0,
        }
    }
}

/// Block generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GeneratorConfig {
    /// First block number
    #[validate(range(min = 1))]
    pub start_block: u64,

    /// Pause between two generated blocks
    #[validate(custom(function = "validate_pacing"))]
    pub pacing: Pacing,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start_block: 1,
            pacing: Pacing::normal(4000.0, 1000.0),
        }
    }
}

/// Work function configuration of the three fixed stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StagesConfig {
    #[validate(nested)]
    pub fetch: WorkerConfig,

    #[validate(nested)]
    pub transform: WorkerConfig,

    #[validate(nested)]
    pub store: WorkerConfig,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            fetch: WorkerConfig::new(Pacing::normal(4000.0, 1000.0), 7),
            transform: WorkerConfig::new(Pacing::normal(2000.0, 500.0), 5),
            store: WorkerConfig::new(Pacing::normal(200.0, 50.0), 3),
        }
    }
}

impl StagesConfig {
    /// Iterate `(key, config)` in pipeline order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &WorkerConfig)> {
        [
            ("fetch", &self.fetch),
            ("transform", &self.transform),
            ("store", &self.store),
        ]
        .into_iter()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut WorkerConfig> {
        [&mut self.fetch, &mut self.transform, &mut self.store].into_iter()
    }
}

/// Simulated work function parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WorkerConfig {
    /// Simulated latency per block
    #[serde(default)]
    #[validate(custom(function = "validate_pacing"))]
    pub latency: Pacing,

    /// Fail blocks whose number is a multiple of this (0 = never fail)
    #[serde(default)]
    pub fail_every: u64,
}

impl WorkerConfig {
    pub fn new(latency: Pacing, fail_every: u64) -> Self {
        Self {
            latency,
            fail_every,
        }
    }
}

impl PipelineBlueprint {
    /// Remove every simulated delay
    pub fn without_delays(mut self) -> Self {
        self.generator.pacing = Pacing::Immediate;
        for stage in self.stages.iter_mut() {
            stage.latency = Pacing::Immediate;
        }
        self
    }

    /// Disable failure injection in every stage
    pub fn without_failures(mut self) -> Self {
        for stage in self.stages.iter_mut() {
            stage.fail_every = 0;
        }
        self
    }

    /// Bound the generator (`None` = unbounded)
    pub fn max_blocks(&self) -> Option<u64> {
        match self.pipeline.max_blocks {
            0 => None,
            n => Some(n),
        }
    }
}

fn validate_pacing(pacing: &Pacing) -> Result<(), ValidationError> {
    pacing.check().map_err(|message| {
        let mut err = ValidationError::new("pacing");
        err.message = Some(message.into());
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let bp = PipelineBlueprint::default();
        assert!(bp.validate().is_ok());
        assert_eq!(bp.pipeline.queue_capacity, 10);
        assert_eq!(bp.stages.fetch.fail_every, 7);
        assert_eq!(bp.stages.transform.fail_every, 5);
        assert_eq!(bp.stages.store.fail_every, 3);
        assert_eq!(bp.max_blocks(), None);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut bp = PipelineBlueprint::default();
        bp.pipeline.queue_capacity = 0;
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_negative_stddev_rejected() {
        let mut bp = PipelineBlueprint::default();
        bp.stages.store.latency = Pacing::normal(10.0, -5.0);
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let bp = PipelineBlueprint::default().without_delays().without_failures();
        assert_eq!(bp.generator.pacing, Pacing::Immediate);
        assert!(bp.stages.iter().all(|(_, s)| s.fail_every == 0));
        assert!(bp.stages.iter().all(|(_, s)| s.latency == Pacing::Immediate));
    }
}
