//! Worker trait - the work function applied by a pipeline stage
//!
//! A worker receives the run's cancellation token and one item, and either
//! succeeds or reports a [`WorkFailure`]. The engine treats every failure the
//! same way regardless of cause.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::WorkFailure;

/// Work function contract consumed by a stage
///
/// Implementations may introduce latency; long waits should observe `cancel`
/// so shutdown is not delayed. Being cut short by cancellation is not a failure.
///
/// # Example
///
/// ```ignore
/// struct Double;
///
/// impl Worker<u64> for Double {
///     async fn process(&self, _cancel: &CancellationToken, item: &u64) -> Result<(), WorkFailure> {
///         tracing::info!(doubled = item * 2, "processed");
///         Ok(())
///     }
/// }
/// ```
pub trait Worker<T>: Send + Sync + 'static {
    /// Process one item
    fn process(
        &self,
        cancel: &CancellationToken,
        item: &T,
    ) -> impl Future<Output = Result<(), WorkFailure>> + Send;
}

/// Adapter turning a synchronous closure into a [`Worker`]
pub struct FnWorker<F> {
    f: F,
}

/// Wrap a closure `Fn(&T) -> Result<(), WorkFailure>` as a worker
pub fn from_fn<T, F>(f: F) -> FnWorker<F>
where
    F: Fn(&T) -> Result<(), WorkFailure> + Send + Sync + 'static,
{
    FnWorker { f }
}

impl<T, F> Worker<T> for FnWorker<F>
where
    T: Sync,
    F: Fn(&T) -> Result<(), WorkFailure> + Send + Sync + 'static,
{
    async fn process(&self, _cancel: &CancellationToken, item: &T) -> Result<(), WorkFailure> {
        (self.f)(item)
    }
}
