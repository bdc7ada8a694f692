//! Transform Blocks worker

define_block_worker!(
    TransformBlocks,
    "Transform Blocks",
    transform,
    "Transformed block",
    "transform failure: data inconsistency"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fails_every_fifth_block() {
        let worker = TransformBlocks::new(Pacing::Immediate, 5);
        let cancel = CancellationToken::new();

        assert!(worker.process(&cancel, &BlockId(4)).await.is_ok());
        let err = worker.process(&cancel, &BlockId(10)).await.unwrap_err();
        assert_eq!(err.message(), "transform failure: data inconsistency");
    }

    #[tokio::test]
    async fn test_zero_disables_failures() {
        let worker = TransformBlocks::reliable();
        let cancel = CancellationToken::new();

        for n in 1..=25 {
            assert!(worker.process(&cancel, &BlockId(n)).await.is_ok());
        }
    }
}
