//! Cancellation sources outside the pipeline: OS signals and the run timeout

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() -> Result<(), CliError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate()).map_err(CliError::Signal)?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map_err(CliError::Signal),
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map_err(CliError::Signal)
    }
}

/// Cancel `cancel` on the first OS interrupt
///
/// The task ends on its own once the token is cancelled by anyone else.
pub fn cancel_on_signal(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = shutdown_signal() => match result {
                Ok(()) => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "Interrupts will not stop the pipeline"),
            },
        }
    })
}

/// Cancel `cancel` once `after` has elapsed
pub fn cancel_after(cancel: CancellationToken, after: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                info!(timeout_secs = after.as_secs_f64(), "Run timeout reached, stopping pipeline...");
                cancel.cancel();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_cancel_after_trips_token() {
        let cancel = CancellationToken::new();
        let task = cancel_after(cancel.clone(), Duration::from_millis(20));

        timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .expect("timeout should cancel the token");
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_after_exits_when_already_cancelled() {
        let cancel = CancellationToken::new();
        let task = cancel_after(cancel.clone(), Duration::from_secs(3600));
        cancel.cancel();

        timeout(Duration::from_secs(5), task)
            .await
            .expect("task should stop with the token")
            .unwrap();
    }
}
