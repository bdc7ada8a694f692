//! Pipeline metric recording
//!
//! Thin helpers over the `metrics` facade plus an online statistics
//! accumulator used for per-stage latency summaries.

use metrics::{counter, gauge, histogram};

/// Record one item admitted by the generator
pub fn record_item_generated() {
    counter!("block_pipeline_items_generated_total").increment(1);
}

/// Record a work function outcome
pub fn record_stage_outcome(stage: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "block_pipeline_items_processed_total",
        "stage" => stage.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record work function latency
pub fn record_work_latency_ms(stage: &str, latency_ms: f64) {
    histogram!("block_pipeline_work_latency_ms", "stage" => stage.to_string()).record(latency_ms);
}

/// Record an error report dropped because the stage's error channel was full
pub fn record_error_dropped(stage: &str) {
    counter!("block_pipeline_errors_dropped_total", "stage" => stage.to_string()).increment(1);
}

/// Record the number of items waiting in a stage's inbound queue
pub fn record_queue_depth(stage: &str, depth: usize) {
    gauge!("block_pipeline_queue_depth", "stage" => stage.to_string()).set(depth as f64);
}

/// Record how a pipeline run ended
pub fn record_run_outcome(outcome: &'static str) {
    counter!("block_pipeline_runs_total", "outcome" => outcome).increment(1);
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
