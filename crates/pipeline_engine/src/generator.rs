//! Generator - paced, cancellable source feeding the first queue

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{pause, Pacing};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Feeds items from a lazy source into the first pipeline queue
///
/// Each iteration checks cancellation without blocking, sends the next item
/// (waiting on a full queue throttles the generator to the first stage), then
/// pauses for a freshly sampled interval. The feed queue is closed when the
/// generator stops, which signals end-of-stream downstream.
pub struct Generator<T> {
    source: Box<dyn Iterator<Item = T> + Send>,
    outbound: mpsc::Sender<T>,
    pacing: Pacing,
    generated: Arc<AtomicU64>,
}

impl<T> Generator<T>
where
    T: Debug + Send + 'static,
{
    pub fn new<I>(source: I, outbound: mpsc::Sender<T>, pacing: Pacing) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            source: Box::new(source.into_iter()),
            outbound,
            pacing,
            generated: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared count of items admitted into the feed queue
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.generated)
    }

    /// Start the feed loop on `tracker`; resolves to the number of items admitted
    pub fn run(self, cancel: CancellationToken, tracker: &TaskTracker) -> JoinHandle<u64> {
        tracker.spawn(self.feed(cancel))
    }

    async fn feed(mut self, cancel: CancellationToken) -> u64 {
        loop {
            if cancel.is_cancelled() {
                info!("Cancelled, stopping generation");
                break;
            }

            let Some(item) = self.source.next() else {
                info!("Source exhausted, closing feed queue");
                break;
            };

            debug!(item = ?item, "Sending item");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancelled while feeding, stopping generation");
                    break;
                }
                sent = self.outbound.send(item) => {
                    if sent.is_err() {
                        warn!("Feed queue closed by consumer");
                        break;
                    }
                }
            }

            self.generated.fetch_add(1, Ordering::Relaxed);
            observability::record_item_generated();

            if !pause(&cancel, self.pacing.sample()).await {
                info!("Cancelled while pacing, stopping generation");
                break;
            }
        }

        let generated = self.generated.load(Ordering::Relaxed);
        debug!(generated, "Generator stopped");
        // Dropping `self.outbound` here closes the feed queue.
        generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{timeout, Instant};

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_finite_source_closes_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let tracker = TaskTracker::new();

        let generator = Generator::new(1..=5u64, tx, Pacing::Immediate);
        let handle = generator.run(CancellationToken::new(), &tracker);

        let mut received = Vec::new();
        while let Some(item) = timeout(WAIT, rx.recv()).await.unwrap() {
            received.push(item);
        }
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
        assert_eq!(handle.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_cancel_closes_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let generator = Generator::new(0u64.., tx, Pacing::fixed(Duration::from_millis(5)));
        let handle = generator.run(cancel.clone(), &tracker);

        assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some(0));
        cancel.cancel();

        let generated = timeout(WAIT, handle).await.unwrap().unwrap();
        let mut drained = 1;
        while timeout(WAIT, rx.recv()).await.unwrap().is_some() {
            drained += 1;
        }
        assert_eq!(drained, generated);
    }

    #[tokio::test]
    async fn test_cancel_unblocks_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let generator = Generator::new(0u64.., tx, Pacing::Immediate);
        let counter = generator.counter();
        let handle = generator.run(cancel.clone(), &tracker);

        // Nobody reads: the second send blocks on the full queue.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::Relaxed), 1);

        cancel.cancel();
        assert_eq!(timeout(WAIT, handle).await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_backpressure_throttles_generation() {
        let (tx, mut rx) = mpsc::channel(1);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let generator = Generator::new(0u64.., tx, Pacing::Immediate);
        let counter = generator.counter();
        generator.run(cancel.clone(), &tracker);

        // Slow consumer: 20ms per item.
        let started = Instant::now();
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            rx.recv().await.unwrap();
        }
        let elapsed = started.elapsed();

        // An unthrottled immediate source would have produced far more.
        let produced = counter.load(Ordering::Relaxed);
        assert!(produced <= 7, "generator not throttled: {produced} items");
        assert!(elapsed >= Duration::from_millis(100));

        cancel.cancel();
        tracker.close();
        timeout(WAIT, tracker.wait()).await.unwrap();
    }
}
