//! Stage - one concurrent processing step between two bounded queues

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use contracts::{StageFailure, WorkFailure, Worker};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::error::PipelineError;
use crate::metrics::{StageMetrics, StageSnapshot};

/// Why a stage loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    /// Cancellation observed while waiting for input
    Cancelled,
    /// Cancellation observed while blocked on a full outbound queue; the item was dropped
    CancelledWhileForwarding,
    /// Inbound queue closed and drained (normal end of stream)
    InboundClosed,
    /// Downstream receiver went away
    OutboundClosed,
}

impl StageExit {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::CancelledWhileForwarding => "cancelled while forwarding",
            Self::InboundClosed => "inbound closed",
            Self::OutboundClosed => "outbound closed",
        }
    }
}

/// A named worker reading from an inbound queue and forwarding to an optional outbound queue
///
/// Items are processed strictly one at a time. Only successfully processed items
/// are forwarded, unchanged. Failures are reported on a capacity-1 error channel
/// and never stop the stage by themselves.
pub struct Stage<T, W> {
    name: String,
    worker: W,
    inbound: mpsc::Receiver<T>,
    outbound: Option<mpsc::Sender<T>>,
    errors_tx: mpsc::Sender<StageFailure>,
    errors_rx: mpsc::Receiver<StageFailure>,
    metrics: Arc<StageMetrics>,
}

impl<T, W> Stage<T, W>
where
    T: Debug + Send + Sync + 'static,
    W: Worker<T>,
{
    /// Create a stage; `outbound = None` makes it terminal
    pub fn new(
        name: impl Into<String>,
        worker: W,
        inbound: mpsc::Receiver<T>,
        outbound: Option<mpsc::Sender<T>>,
    ) -> Self {
        let (errors_tx, errors_rx) = mpsc::channel(1);
        Self {
            name: name.into(),
            worker,
            inbound,
            outbound,
            errors_tx,
            errors_rx,
            metrics: Arc::new(StageMetrics::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_terminal(&self) -> bool {
        self.outbound.is_none()
    }

    /// Start the processing loop on `tracker`
    pub fn run(self, cancel: CancellationToken, tracker: &TaskTracker) -> StageHandle {
        let Stage {
            name,
            worker,
            inbound,
            outbound,
            errors_tx,
            errors_rx,
            metrics,
        } = self;

        let runner = StageRunner {
            name: name.clone(),
            worker,
            inbound,
            outbound,
            errors: errors_tx,
            metrics: Arc::clone(&metrics),
        };
        let task = tracker.spawn(runner.run(cancel));

        StageHandle {
            name,
            errors: Some(errors_rx),
            metrics,
            task,
        }
    }
}

/// Type-erased stage, so one pipeline can hold stages with different workers
pub(crate) trait StageTask: Send {
    fn spawn(self: Box<Self>, cancel: CancellationToken, tracker: &TaskTracker) -> StageHandle;
}

impl<T, W> StageTask for Stage<T, W>
where
    T: Debug + Send + Sync + 'static,
    W: Worker<T>,
{
    fn spawn(self: Box<Self>, cancel: CancellationToken, tracker: &TaskTracker) -> StageHandle {
        (*self).run(cancel, tracker)
    }
}

/// Handle to a running stage
pub struct StageHandle {
    name: String,
    errors: Option<mpsc::Receiver<StageFailure>>,
    metrics: Arc<StageMetrics>,
    task: JoinHandle<StageExit>,
}

impl StageHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<StageMetrics> {
        &self.metrics
    }

    /// Take the error report receiver (can only be taken once)
    pub fn take_errors(&mut self) -> Option<mpsc::Receiver<StageFailure>> {
        self.errors.take()
    }

    /// Wait for the stage loop to end and snapshot its counters
    pub async fn finish(self) -> Result<StageSnapshot, PipelineError> {
        let exit = self
            .task
            .await
            .map_err(|e| PipelineError::task_failed(&self.name, e.to_string()))?;
        Ok(self.metrics.snapshot(&self.name, Some(exit)))
    }
}

struct StageRunner<T, W> {
    name: String,
    worker: W,
    inbound: mpsc::Receiver<T>,
    outbound: Option<mpsc::Sender<T>>,
    errors: mpsc::Sender<StageFailure>,
    metrics: Arc<StageMetrics>,
}

impl<T, W> StageRunner<T, W>
where
    T: Debug + Send + Sync + 'static,
    W: Worker<T>,
{
    async fn run(mut self, cancel: CancellationToken) -> StageExit {
        debug!(stage = %self.name, terminal = self.outbound.is_none(), "Stage started");

        let exit = self.process_loop(&cancel).await;

        info!(
            stage = %self.name,
            reason = exit.label(),
            received = self.metrics.received(),
            forwarded = self.metrics.forwarded(),
            failed = self.metrics.failed(),
            "Stage stopped"
        );
        exit
    }

    async fn process_loop(&mut self, cancel: &CancellationToken) -> StageExit {
        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(stage = %self.name, "Cancelled, shutting down");
                    return StageExit::Cancelled;
                }
                item = self.inbound.recv() => match item {
                    Some(item) => item,
                    None => {
                        info!(stage = %self.name, "Inbound queue closed");
                        return StageExit::InboundClosed;
                    }
                },
            };

            self.metrics.inc_received();
            observability::record_queue_depth(&self.name, self.inbound.len());
            trace!(stage = %self.name, item = ?item, "Item received");

            let started = Instant::now();
            let result = self.worker.process(cancel, &item).await;
            let elapsed = started.elapsed();
            self.metrics.record_latency(elapsed);
            observability::record_work_latency_ms(&self.name, elapsed.as_secs_f64() * 1000.0);

            match result {
                Ok(()) => {
                    self.metrics.inc_succeeded();
                    observability::record_stage_outcome(&self.name, true);

                    if let Some(exit) = self.forward(cancel, item).await {
                        return exit;
                    }
                }
                Err(cause) => {
                    self.metrics.inc_failed();
                    observability::record_stage_outcome(&self.name, false);
                    warn!(stage = %self.name, item = ?item, error = %cause, "Work function failed");
                    self.report(cause);
                }
            }
        }
    }

    /// Forward to the outbound queue; `Some(exit)` ends the loop
    async fn forward(&self, cancel: &CancellationToken, item: T) -> Option<StageExit> {
        let outbound = self.outbound.as_ref()?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(stage = %self.name, "Cancelled while sending to outbound");
                Some(StageExit::CancelledWhileForwarding)
            }
            sent = outbound.send(item) => match sent {
                Ok(()) => {
                    self.metrics.inc_forwarded();
                    None
                }
                Err(_) => {
                    warn!(stage = %self.name, "Outbound queue closed by consumer");
                    Some(StageExit::OutboundClosed)
                }
            },
        }
    }

    /// Report a failure without ever blocking the loop
    fn report(&self, cause: WorkFailure) {
        let failure = StageFailure::new(self.name.clone(), cause);
        match self.errors.try_send(failure) {
            Ok(()) => self.metrics.inc_errors_reported(),
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                self.metrics.inc_errors_dropped();
                observability::record_error_dropped(&self.name);
                warn!(
                    stage = %self.name,
                    error = %dropped.cause,
                    "Error channel is full, dropping error"
                );
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                self.metrics.inc_errors_dropped();
                observability::record_error_dropped(&self.name);
                debug!(
                    stage = %self.name,
                    error = %dropped.cause,
                    "No supervisor listening, dropping error"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::from_fn;
    use std::io;
    use std::sync::Mutex;
    use tokio::time::{sleep, timeout, Duration};
    use tracing_subscriber::fmt::MakeWriter;

    const WAIT: Duration = Duration::from_secs(2);

    fn fail_on_multiple_of(n: u64) -> impl Worker<u64> {
        from_fn(move |item: &u64| {
            if item % n == 0 {
                Err(WorkFailure::new(format!("item {item} rejected")))
            } else {
                Ok(())
            }
        })
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        timeout(WAIT, async {
            while !condition() {
                sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_forwards_in_order_and_stops_on_close() {
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let stage = Stage::new("Double", from_fn(|_: &u64| Ok(())), in_rx, Some(out_tx));
        let handle = stage.run(cancel, &tracker);

        for i in 1..=10u64 {
            in_tx.send(i).await.unwrap();
        }
        drop(in_tx);

        let mut received = Vec::new();
        while let Some(item) = timeout(WAIT, out_rx.recv()).await.unwrap() {
            received.push(item);
        }
        assert_eq!(received, (1..=10).collect::<Vec<_>>());

        let snap = handle.finish().await.unwrap();
        assert_eq!(snap.exit, Some(StageExit::InboundClosed));
        assert_eq!(snap.forwarded, 10);
        assert_eq!(snap.errors_reported, 0);
    }

    #[tokio::test]
    async fn test_terminal_stage_never_forwards() {
        let (in_tx, in_rx) = mpsc::channel(4);
        let tracker = TaskTracker::new();

        let stage = Stage::new("Sink", from_fn(|_: &u64| Ok(())), in_rx, None);
        assert!(stage.is_terminal());
        let handle = stage.run(CancellationToken::new(), &tracker);

        for i in 0..5u64 {
            in_tx.send(i).await.unwrap();
        }
        drop(in_tx);

        let snap = timeout(WAIT, handle.finish()).await.unwrap().unwrap();
        assert_eq!(snap.succeeded, 5);
        assert_eq!(snap.forwarded, 0);
        assert_eq!(snap.exit, Some(StageExit::InboundClosed));
    }

    #[tokio::test]
    async fn test_failure_reported_and_not_forwarded() {
        let (in_tx, in_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let tracker = TaskTracker::new();

        let stage = Stage::new("Check", fail_on_multiple_of(7), in_rx, Some(out_tx));
        let mut handle = stage.run(CancellationToken::new(), &tracker);
        let mut errors = handle.take_errors().unwrap();
        assert!(handle.take_errors().is_none());

        for i in 1..=10u64 {
            in_tx.send(i).await.unwrap();
        }
        drop(in_tx);

        let failure = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
        assert_eq!(failure.stage, "Check");
        assert_eq!(failure.cause.message(), "item 7 rejected");

        let mut received = Vec::new();
        while let Some(item) = timeout(WAIT, out_rx.recv()).await.unwrap() {
            received.push(item);
        }
        assert_eq!(received, vec![1, 2, 3, 4, 5, 6, 8, 9, 10]);

        let snap = handle.finish().await.unwrap();
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.errors_reported, 1);
        assert_eq!(snap.errors_dropped, 0);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_full_error_channel_drops_and_logs() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let tracker = TaskTracker::new();

        let always_fail = from_fn(|item: &u64| Err(WorkFailure::new(format!("boom {item}"))));
        let stage = Stage::new("Flaky", always_fail, in_rx, Some(out_tx));
        // Keep the handle (and its unread error receiver) alive for the whole run.
        let handle = stage.run(CancellationToken::new(), &tracker);

        for i in 1..=3u64 {
            in_tx.send(i).await.unwrap();
        }
        drop(in_tx);

        wait_until(|| handle.metrics().received() == 3).await;
        let metrics = Arc::clone(handle.metrics());
        let snap = handle.finish().await.unwrap();

        assert_eq!(snap.exit, Some(StageExit::InboundClosed));
        assert_eq!(metrics.errors_reported(), 1);
        assert_eq!(metrics.errors_dropped(), 2);
        assert!(out_rx.recv().await.is_none());

        let output = logs.contents();
        assert!(
            output.contains("Error channel is full, dropping error"),
            "missing drop warning in logs: {output}"
        );
        assert!(output.contains("boom 2"));
        assert!(output.contains("boom 3"));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_input() {
        let (_in_tx, in_rx) = mpsc::channel::<u64>(1);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let stage = Stage::new("Idle", from_fn(|_: &u64| Ok(())), in_rx, None);
        let handle = stage.run(cancel.clone(), &tracker);

        cancel.cancel();
        let snap = timeout(WAIT, handle.finish()).await.unwrap().unwrap();
        assert_eq!(snap.exit, Some(StageExit::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_while_blocked_on_full_outbound() {
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, _out_rx) = mpsc::channel(1);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let stage = Stage::new("Blocked", from_fn(|_: &u64| Ok(())), in_rx, Some(out_tx));
        let handle = stage.run(cancel.clone(), &tracker);

        in_tx.send(1).await.unwrap();
        in_tx.send(2).await.unwrap();

        // Item 1 fills the outbound queue, item 2 is stuck forwarding.
        wait_until(|| handle.metrics().succeeded() == 2).await;
        cancel.cancel();

        let snap = timeout(WAIT, handle.finish()).await.unwrap().unwrap();
        assert_eq!(snap.exit, Some(StageExit::CancelledWhileForwarding));
        assert_eq!(snap.forwarded, 1);
    }

    #[tokio::test]
    async fn test_outbound_closed_ends_stage() {
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, out_rx) = mpsc::channel(4);
        drop(out_rx);
        let tracker = TaskTracker::new();

        let stage = Stage::new("Orphan", from_fn(|_: &u64| Ok(())), in_rx, Some(out_tx));
        let handle = stage.run(CancellationToken::new(), &tracker);
        in_tx.send(1).await.unwrap();

        let snap = timeout(WAIT, handle.finish()).await.unwrap().unwrap();
        assert_eq!(snap.exit, Some(StageExit::OutboundClosed));
    }
}
