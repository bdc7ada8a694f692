//! Pipeline - wires a fixed sequence of stages and runs them to shutdown

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{Pacing, StageFailure, Worker};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::generator::Generator;
use crate::metrics::StageSnapshot;
use crate::stage::{Stage, StageTask};
use crate::supervisor::Supervisor;

type StageFactory<T> =
    Box<dyn FnOnce(mpsc::Receiver<T>, Option<mpsc::Sender<T>>) -> Box<dyn StageTask> + Send>;

struct PendingStage<T> {
    name: String,
    factory: StageFactory<T>,
}

/// Builder fixing the stage topology of a pipeline
///
/// Stages run in the order they are added. The topology cannot change once built.
pub struct PipelineBuilder<T> {
    queue_capacity: usize,
    stages: Vec<PendingStage<T>>,
}

impl<T> PipelineBuilder<T>
where
    T: Debug + Send + Sync + 'static,
{
    /// Create a builder; every queue gets `queue_capacity` slots
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            stages: Vec::new(),
        }
    }

    /// Append a stage
    pub fn stage<W: Worker<T>>(mut self, name: impl Into<String>, worker: W) -> Self {
        let name = name.into();
        let stage_name = name.clone();
        self.stages.push(PendingStage {
            name,
            factory: Box::new(move |inbound, outbound| {
                Box::new(Stage::new(stage_name, worker, inbound, outbound)) as Box<dyn StageTask>
            }),
        });
        self
    }

    /// Build with an output queue after the last stage
    ///
    /// The output can be taken with [`Pipeline::take_output`]; otherwise it is drained.
    pub fn build<I>(self, source: I, pacing: Pacing) -> Result<Pipeline<T>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        self.assemble(source, pacing, false)
    }

    /// Build with a terminal last stage (no output queue)
    pub fn build_terminal<I>(self, source: I, pacing: Pacing) -> Result<Pipeline<T>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        self.assemble(source, pacing, true)
    }

    #[instrument(
        name = "pipeline_builder_assemble",
        skip(self, source),
        fields(stages = self.stages.len(), queue_capacity = self.queue_capacity)
    )]
    fn assemble<I>(self, source: I, pacing: Pacing, terminal: bool) -> Result<Pipeline<T>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let capacity = self.queue_capacity;
        if capacity == 0 {
            return Err(PipelineError::InvalidCapacity { capacity });
        }

        let mut pending = self.stages;
        let Some(last) = pending.pop() else {
            return Err(PipelineError::NoStages);
        };

        let stage_names: Vec<String> = pending
            .iter()
            .chain(std::iter::once(&last))
            .map(|p| p.name.clone())
            .collect();

        let (feed_tx, mut inbound) = mpsc::channel(capacity);
        let mut stages = Vec::with_capacity(stage_names.len());

        for stage in pending {
            let (tx, rx) = mpsc::channel(capacity);
            stages.push((stage.factory)(inbound, Some(tx)));
            inbound = rx;
        }

        let output = if terminal {
            stages.push((last.factory)(inbound, None));
            None
        } else {
            let (tx, rx) = mpsc::channel(capacity);
            stages.push((last.factory)(inbound, Some(tx)));
            Some(rx)
        };

        debug!(stages = ?stage_names, terminal, "Pipeline assembled");

        Ok(Pipeline {
            stage_names,
            stages,
            generator: Generator::new(source, feed_tx, pacing),
            output,
            terminal,
        })
    }
}

/// A fully wired, not yet started pipeline
pub struct Pipeline<T> {
    stage_names: Vec<String>,
    stages: Vec<Box<dyn StageTask>>,
    generator: Generator<T>,
    output: Option<mpsc::Receiver<T>>,
    terminal: bool,
}

impl<T> Pipeline<T>
where
    T: Debug + Send + Sync + 'static,
{
    /// Stage names in pipeline order
    pub fn stage_names(&self) -> &[String] {
        &self.stage_names
    }

    /// Whether the last stage is terminal
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Take the final queue's receiver (can only be taken once)
    ///
    /// The caller must keep consuming it, or the last stage blocks on a full queue
    /// until cancellation.
    pub fn take_output(&mut self) -> Option<mpsc::Receiver<T>> {
        self.output.take()
    }

    /// Start every task and block until all of them have finished
    ///
    /// Cancelling `parent` shuts the pipeline down; a stage failure cancels only
    /// this run. Stage failures are reported in [`PipelineReport::outcome`].
    #[instrument(name = "pipeline_run", skip_all, fields(stages = self.stage_names.len()))]
    pub async fn run(self, parent: &CancellationToken) -> Result<PipelineReport> {
        let started = Instant::now();
        let cancel = parent.child_token();
        let tracker = TaskTracker::new();

        info!(stages = ?self.stage_names, "Starting pipeline");

        let mut handles: Vec<_> = self
            .stages
            .into_iter()
            .map(|stage| stage.spawn(cancel.clone(), &tracker))
            .collect();

        let delivered = match self.output {
            Some(output) => {
                let delivered = Arc::new(AtomicU64::new(0));
                tracker.spawn(drain(output, cancel.clone(), Arc::clone(&delivered)));
                Some(delivered)
            }
            None => None,
        };

        let generated = self.generator.counter();
        let generator = self.generator.run(cancel.clone(), &tracker);

        let watches = handles.iter_mut().filter_map(|h| h.take_errors()).collect();
        let supervisor = tracker.spawn(Supervisor::new(cancel.clone(), watches).run());

        tracker.close();
        tracker.wait().await;
        debug!("All pipeline tasks finished");

        let failure = supervisor
            .await
            .map_err(|e| PipelineError::task_failed("supervisor", e.to_string()))?;
        generator
            .await
            .map_err(|e| PipelineError::task_failed("generator", e.to_string()))?;

        let mut stages = Vec::with_capacity(handles.len());
        for handle in handles {
            stages.push(handle.finish().await?);
        }

        let outcome = match failure {
            Some(failure) => RunOutcome::Failed(failure),
            None if cancel.is_cancelled() => RunOutcome::Cancelled,
            None => RunOutcome::Drained,
        };
        observability::record_run_outcome(outcome.label());

        let report = PipelineReport {
            outcome,
            items_generated: generated.load(Ordering::Relaxed),
            items_delivered: delivered.map(|d| d.load(Ordering::Relaxed)),
            stages,
            duration: started.elapsed(),
        };

        match &report.outcome {
            RunOutcome::Failed(failure) => error!(
                stage = %failure.stage,
                generated = report.items_generated,
                duration_secs = report.duration.as_secs_f64(),
                "Pipeline stopped on stage failure"
            ),
            outcome => info!(
                outcome = outcome.label(),
                generated = report.items_generated,
                duration_secs = report.duration.as_secs_f64(),
                "Pipeline shutdown complete"
            ),
        }

        Ok(report)
    }
}

/// Discard items leaving the last stage
async fn drain<T: Debug>(
    mut output: mpsc::Receiver<T>,
    cancel: CancellationToken,
    delivered: Arc<AtomicU64>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = output.recv() => match item {
                Some(item) => {
                    delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(item = ?item, "Item left the pipeline");
                }
                None => break,
            },
        }
    }
    if !output.is_empty() {
        warn!(pending = output.len(), "Dropping items left in output queue");
    }
}

/// How a pipeline run ended
///
/// `Failed` takes precedence: a report already queued when the caller cancels
/// still ends the run as a failure.
#[derive(Debug)]
pub enum RunOutcome {
    /// The source was exhausted and every stage drained its inbound queue
    Drained,
    /// The caller cancelled the run
    Cancelled,
    /// A stage reported a failure and the supervisor cancelled the run
    Failed(StageFailure),
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Drained => "drained",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Summary of a finished run
#[derive(Debug)]
pub struct PipelineReport {
    pub outcome: RunOutcome,
    /// Items admitted into the first queue
    pub items_generated: u64,
    /// Items that left the last queue (None when the caller took the output)
    pub items_delivered: Option<u64>,
    /// Per-stage counters in pipeline order
    pub stages: Vec<StageSnapshot>,
    pub duration: Duration,
}

impl PipelineReport {
    /// Whether the run ended on a stage failure
    pub fn is_fatal(&self) -> bool {
        matches!(self.outcome, RunOutcome::Failed(_))
    }

    /// Generated items per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.items_generated as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn stage(&self, name: &str) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.name == name)
    }
}
