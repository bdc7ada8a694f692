//! # Integration Tests
//!
//! Cross-crate end-to-end scenarios.
//!
//! Covers:
//! - Configuration snapshot round trips
//! - Ordering, failure escalation and cancellation across the whole pipeline
//! - Backpressure through bounded queues

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::PipelineBlueprint;

    #[test]
    fn test_empty_config_is_stock_pipeline() {
        let bp = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();
        assert_eq!(bp, PipelineBlueprint::default());
        assert_eq!(bp.stages.fetch.fail_every, 7);
        assert_eq!(bp.stages.transform.fail_every, 5);
        assert_eq!(bp.stages.store.fail_every, 3);
    }

    #[test]
    fn test_default_blueprint_survives_toml() {
        let bp = PipelineBlueprint::default();
        let toml = ConfigLoader::to_toml(&bp).unwrap();
        let parsed = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, bp);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use contracts::{from_fn, pause, BlockId, Pacing, PipelineBlueprint, WorkFailure, Worker};
    use pipeline_engine::{PipelineBuilder, RunOutcome, StageExit};
    use tokio::time::{sleep, timeout};
    use tokio_util::sync::CancellationToken;

    const WAIT: Duration = Duration::from_secs(10);

    /// Worker that holds each item for a fixed time and counts completions
    struct SlowWorker {
        delay: Duration,
        done: Arc<AtomicU64>,
    }

    impl Worker<u64> for SlowWorker {
        async fn process(&self, cancel: &CancellationToken, _item: &u64) -> Result<(), WorkFailure> {
            if pause(cancel, self.delay).await {
                self.done.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }
    }

    fn pass() -> impl Worker<u64> {
        from_fn(|_: &u64| Ok(()))
    }

    /// End-to-end: every generated block reaches the output queue in order
    #[tokio::test]
    async fn test_block_pipeline_preserves_order() {
        let mut bp = PipelineBlueprint::default()
            .without_delays()
            .without_failures();
        bp.pipeline.max_blocks = 200;
        bp.pipeline.queue_capacity = 3;

        let mut pipeline = block_workers::block_pipeline(&bp).unwrap();
        let mut output = pipeline.take_output().unwrap();

        let collector = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(block) = output.recv().await {
                seen.push(block);
            }
            seen
        });

        let report = timeout(WAIT, pipeline.run(&CancellationToken::new()))
            .await
            .unwrap()
            .unwrap();
        let seen = collector.await.unwrap();

        assert!(matches!(report.outcome, RunOutcome::Drained));
        let expected: Vec<_> = BlockId::sequence(1).take(200).collect();
        assert_eq!(seen, expected);
        for stage in &report.stages {
            assert_eq!(stage.exit, Some(StageExit::InboundClosed), "{}", stage.name);
            assert_eq!(stage.forwarded, 200);
        }
    }

    /// A stage failing on multiples of 7: one report, and the generator stops admitting blocks
    #[tokio::test]
    async fn test_single_failure_cancels_pipeline() {
        let pipeline = PipelineBuilder::new(10)
            .stage("first", pass())
            .stage(
                "sevens",
                from_fn(|item: &u64| {
                    if item % 7 == 0 {
                        Err(WorkFailure::new(format!("item {item} rejected")))
                    } else {
                        Ok(())
                    }
                }),
            )
            .stage("last", pass())
            .build(1u64.., Pacing::fixed(Duration::from_millis(25)))
            .unwrap();

        let caller = CancellationToken::new();
        let report = timeout(WAIT, pipeline.run(&caller)).await.unwrap().unwrap();

        let failure = report.outcome.failure().expect("run should fail");
        assert_eq!(failure.stage, "sevens");
        assert_eq!(failure.cause.message(), "item 7 rejected");

        let sevens = report.stage("sevens").unwrap();
        assert_eq!(sevens.failed, 1);
        assert_eq!(sevens.errors_reported, 1);
        assert_eq!(sevens.errors_dropped, 0);
        // items before the failure were forwarded
        assert!(sevens.forwarded >= 6);
        // cancellation cut the pacing pause after item 7; nothing further was admitted
        assert!(
            (7..=8).contains(&report.items_generated),
            "generated {} items from an unbounded source",
            report.items_generated
        );
        assert!(!caller.is_cancelled());
    }

    /// The last representable block ends an unbounded source instead of overflowing
    #[tokio::test]
    async fn test_unbounded_source_ends_at_last_block() {
        let mut bp = PipelineBlueprint::default()
            .without_delays()
            .without_failures();
        bp.generator.start_block = u64::MAX;
        bp.pipeline.max_blocks = 0;
        config_loader::ConfigLoader::validate(&bp).unwrap();

        let report = timeout(
            WAIT,
            block_workers::start_pipeline(&CancellationToken::new(), &bp),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(matches!(report.outcome, RunOutcome::Drained));
        assert_eq!(report.items_generated, 1);
        assert_eq!(report.items_delivered, Some(1));
    }

    /// Always-succeeding pipeline runs until the caller cancels, then fully shuts down
    #[tokio::test]
    async fn test_external_cancel_stops_unbounded_run() {
        let mut bp = PipelineBlueprint::default()
            .without_delays()
            .without_failures();
        bp.generator.pacing = Pacing::fixed(Duration::from_millis(2));

        let cancel = CancellationToken::new();
        let run = tokio::spawn({
            let cancel = cancel.clone();
            async move { block_workers::start_pipeline(&cancel, &bp).await }
        });

        sleep(Duration::from_millis(150)).await;
        assert!(!run.is_finished(), "unbounded pipeline should keep running");

        let cancelled_at = Instant::now();
        cancel.cancel();
        let report = timeout(WAIT, run).await.unwrap().unwrap().unwrap();

        assert!(cancelled_at.elapsed() < Duration::from_secs(2));
        assert!(matches!(report.outcome, RunOutcome::Cancelled));
        assert!(report.items_generated > 0);
        for stage in &report.stages {
            assert!(stage.exit.is_some(), "{} did not report an exit", stage.name);
            assert_eq!(stage.failed, 0);
        }
    }

    /// With capacity 1 the generator is throttled to the slow stage's pace
    #[tokio::test]
    async fn test_backpressure_throttles_generator() {
        let done = Arc::new(AtomicU64::new(0));
        let pipeline = PipelineBuilder::new(1)
            .stage(
                "slow",
                SlowWorker {
                    delay: Duration::from_millis(25),
                    done: Arc::clone(&done),
                },
            )
            .build(0u64.., Pacing::Immediate)
            .unwrap();

        let cancel = CancellationToken::new();
        let run = tokio::spawn({
            let cancel = cancel.clone();
            async move { pipeline.run(&cancel).await }
        });

        sleep(Duration::from_millis(300)).await;
        cancel.cancel();
        let report = timeout(WAIT, run).await.unwrap().unwrap().unwrap();

        // One in the feed queue, one in the worker, one in the output queue
        let processed = done.load(Ordering::Relaxed);
        assert!(processed >= 3, "slow stage processed {processed}");
        assert!(
            report.items_generated <= processed + 4,
            "generated {} while only {processed} were processed",
            report.items_generated
        );
    }

    /// A terminal stage never forwards and the run still drains
    #[tokio::test]
    async fn test_terminal_pipeline_drains() {
        let mut pipeline = PipelineBuilder::new(2)
            .stage("head", pass())
            .stage("tail", pass())
            .build_terminal(1..=30u64, Pacing::Immediate)
            .unwrap();
        assert!(pipeline.take_output().is_none());

        let report = timeout(WAIT, pipeline.run(&CancellationToken::new()))
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(report.outcome, RunOutcome::Drained));
        assert_eq!(report.items_delivered, None);
        let tail = report.stage("tail").unwrap();
        assert_eq!(tail.succeeded, 30);
        assert_eq!(tail.forwarded, 0);
        assert_eq!(tail.exit, Some(StageExit::InboundClosed));
    }

    /// Closing the source ends every stage through the inbound-closed path
    #[tokio::test]
    async fn test_finite_source_closes_cleanly() {
        let mut bp = PipelineBlueprint::default()
            .without_delays()
            .without_failures();
        bp.pipeline.max_blocks = 40;
        bp.generator.start_block = 100;

        let report = timeout(
            WAIT,
            block_workers::start_pipeline(&CancellationToken::new(), &bp),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(matches!(report.outcome, RunOutcome::Drained));
        assert!(!report.is_fatal());
        assert_eq!(report.items_generated, 40);
        assert_eq!(report.items_delivered, Some(40));
        for stage in &report.stages {
            assert_eq!(stage.exit, Some(StageExit::InboundClosed));
            assert_eq!(stage.errors_reported, 0);
        }
    }

    /// The stock failure schedule stops the block pipeline at the first failing block
    #[tokio::test]
    async fn test_stock_failures_are_fatal() {
        let mut bp = PipelineBlueprint::default().without_delays();
        bp.pipeline.max_blocks = 50;

        let report = timeout(
            WAIT,
            block_workers::start_pipeline(&CancellationToken::new(), &bp),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(report.is_fatal());
        let failure = report.outcome.failure().unwrap();
        assert!(block_workers::STAGE_NAMES.contains(&failure.stage.as_str()));
    }
}
