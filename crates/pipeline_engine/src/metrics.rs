//! Stage counters for observability

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use observability::{RunningStats, StatsSummary};

use crate::stage::StageExit;

/// Counters for a single stage, shared between the stage task and its handle
#[derive(Debug, Default)]
pub struct StageMetrics {
    received: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    forwarded: AtomicU64,
    errors_reported: AtomicU64,
    errors_dropped: AtomicU64,
    latency_ms: Mutex<RunningStats>,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn inc_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn inc_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn errors_reported(&self) -> u64 {
        self.errors_reported.load(Ordering::Relaxed)
    }

    pub fn inc_errors_reported(&self) {
        self.errors_reported.fetch_add(1, Ordering::Relaxed);
    }

    /// Error reports dropped because one was already pending
    pub fn errors_dropped(&self) -> u64 {
        self.errors_dropped.load(Ordering::Relaxed)
    }

    pub fn inc_errors_dropped(&self) {
        self.errors_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one work function invocation
    pub fn record_latency(&self, elapsed: Duration) {
        if let Ok(mut stats) = self.latency_ms.lock() {
            stats.push(elapsed.as_secs_f64() * 1000.0);
        }
    }

    pub fn latency_summary(&self) -> StatsSummary {
        self.latency_ms
            .lock()
            .map(|stats| stats.summary())
            .unwrap_or_default()
    }

    /// Snapshot of all counters
    pub fn snapshot(&self, name: &str, exit: Option<StageExit>) -> StageSnapshot {
        StageSnapshot {
            name: name.to_string(),
            exit,
            received: self.received(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            forwarded: self.forwarded(),
            errors_reported: self.errors_reported(),
            errors_dropped: self.errors_dropped(),
            latency_ms: self.latency_summary(),
        }
    }
}

/// Snapshot of stage metrics (for reporting)
#[derive(Debug, Clone)]
pub struct StageSnapshot {
    pub name: String,
    /// Why the stage loop ended (None while still running)
    pub exit: Option<StageExit>,
    pub received: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub forwarded: u64,
    pub errors_reported: u64,
    pub errors_dropped: u64,
    pub latency_ms: StatsSummary,
}
