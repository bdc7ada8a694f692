//! Pacing - randomized delays for generators and simulated work

use std::time::Duration;

use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Delay distribution
///
/// Negative normal draws are clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pacing {
    /// No delay
    #[default]
    Immediate,
    /// Constant delay
    Fixed { ms: u64 },
    /// Normally distributed delay (milliseconds)
    Normal { mean_ms: f64, stddev_ms: f64 },
}

impl Pacing {
    /// Normally distributed pacing
    pub fn normal(mean_ms: f64, stddev_ms: f64) -> Self {
        Self::Normal { mean_ms, stddev_ms }
    }

    /// Constant pacing
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed {
            ms: delay.as_millis() as u64,
        }
    }

    /// Draw one delay
    pub fn sample(&self) -> Duration {
        match *self {
            Self::Immediate => Duration::ZERO,
            Self::Fixed { ms } => Duration::from_millis(ms),
            Self::Normal { mean_ms, stddev_ms } => {
                let draw = match Normal::new(mean_ms, stddev_ms) {
                    Ok(dist) => dist.sample(&mut rand::rng()),
                    Err(_) => mean_ms,
                };
                if draw.is_finite() && draw > 0.0 {
                    Duration::from_secs_f64(draw / 1000.0)
                } else {
                    Duration::ZERO
                }
            }
        }
    }

    /// Check distribution parameters
    pub fn check(&self) -> Result<(), String> {
        match *self {
            Self::Normal { mean_ms, stddev_ms } => {
                if !mean_ms.is_finite() || mean_ms < 0.0 {
                    return Err(format!("mean_ms must be finite and >= 0, got {mean_ms}"));
                }
                if !stddev_ms.is_finite() || stddev_ms < 0.0 {
                    return Err(format!("stddev_ms must be finite and >= 0, got {stddev_ms}"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Sleep for `delay` unless `cancel` trips first
///
/// Returns `false` when the sleep was cut short by cancellation.
pub async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
