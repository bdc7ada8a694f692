//! Custom Stages Demo
//!
//! Builds a pipeline over a non-block item type with hand-written workers
//! and reads the final queue directly.
//!
//! Run with: cargo run -p demos --bin custom_stages

use std::time::Duration;

use contracts::{from_fn, pause, CancellationToken, Pacing, WorkFailure, Worker};
use pipeline_engine::PipelineBuilder;
use tracing::info;

#[derive(Debug)]
struct Order {
    id: u32,
    amount_cents: u64,
}

/// Simulates a remote price check
struct PriceCheck {
    delay: Duration,
    limit_cents: u64,
}

impl Worker<Order> for PriceCheck {
    async fn process(&self, cancel: &CancellationToken, order: &Order) -> Result<(), WorkFailure> {
        if !pause(cancel, self.delay).await {
            return Ok(());
        }
        if order.amount_cents > self.limit_cents {
            return Err(WorkFailure::new(format!(
                "order {} exceeds limit: {} > {}",
                order.id, order.amount_cents, self.limit_cents
            )));
        }
        info!(order = order.id, "Price checked");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_tracing(observability::LogFormat::Compact, "info")?;

    let orders = (1..=20).map(|id| Order {
        id,
        amount_cents: u64::from(id) * 1_000,
    });

    let mut pipeline = PipelineBuilder::new(4)
        .stage(
            "Validate",
            from_fn(|order: &Order| {
                if order.amount_cents == 0 {
                    Err(WorkFailure::new("empty order"))
                } else {
                    Ok(())
                }
            }),
        )
        .stage(
            "Price Check",
            PriceCheck {
                delay: Duration::from_millis(20),
                limit_cents: 15_000,
            },
        )
        .build(orders, Pacing::fixed(Duration::from_millis(10)))?;

    let mut output = pipeline.take_output().ok_or("output already taken")?;
    let consumer = tokio::spawn(async move {
        let mut accepted = Vec::new();
        while let Some(order) = output.recv().await {
            accepted.push(order.id);
        }
        accepted
    });

    let report = pipeline.run(&CancellationToken::new()).await?;
    let accepted = consumer.await?;

    info!(
        outcome = report.outcome.label(),
        accepted = ?accepted,
        "=== Demo Complete ==="
    );
    if let Some(failure) = report.outcome.failure() {
        info!(%failure, "First rejected order stopped the run");
    }

    Ok(())
}
