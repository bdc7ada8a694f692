//! Supervisor - escalates the first stage failure into pipeline-wide cancellation

use std::future::poll_fn;
use std::task::Poll;

use contracts::StageFailure;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Watches every stage's error channel
///
/// Any report is fatal: the supervisor logs it, trips the shared token and
/// returns the failure to the orchestrator. It never terminates the process.
pub struct Supervisor {
    cancel: CancellationToken,
    watches: Vec<mpsc::Receiver<StageFailure>>,
}

impl Supervisor {
    pub fn new(cancel: CancellationToken, watches: Vec<mpsc::Receiver<StageFailure>>) -> Self {
        Self { cancel, watches }
    }

    /// Run until cancellation, the first failure, or every stage has exited
    pub async fn run(mut self) -> Option<StageFailure> {
        debug!(stages = self.watches.len(), "Supervisor started");

        let failure = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => match self.pending_report() {
                Some(failure) => failure,
                None => {
                    debug!("Cancelled, supervisor exiting");
                    return None;
                }
            },
            report = next_report(&mut self.watches) => match report {
                Some(failure) => failure,
                None => {
                    debug!("All stages exited, supervisor exiting");
                    return None;
                }
            },
        };

        error!(stage = %failure.stage, error = %failure.cause, "Stage reported error");
        error!(error = %failure, "Critical error encountered, cancelling pipeline");
        self.cancel.cancel();

        Some(failure)
    }

    /// A report already buffered when cancellation landed still counts as a failure
    fn pending_report(&mut self) -> Option<StageFailure> {
        self.watches.iter_mut().find_map(|rx| rx.try_recv().ok())
    }
}

/// Next report from any stage; `None` once every error channel is closed
async fn next_report(watches: &mut [mpsc::Receiver<StageFailure>]) -> Option<StageFailure> {
    poll_fn(|cx| {
        let mut open = false;
        for rx in watches.iter_mut() {
            match rx.poll_recv(cx) {
                Poll::Ready(Some(failure)) => return Poll::Ready(Some(failure)),
                Poll::Ready(None) => {}
                Poll::Pending => open = true,
            }
        }
        if open {
            Poll::Pending
        } else {
            Poll::Ready(None)
        }
    })
    .await
}
