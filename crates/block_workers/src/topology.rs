//! Fixed block pipeline topology

use contracts::{BlockId, CancellationToken, PipelineBlueprint};
use pipeline_engine::{Pipeline, PipelineBuilder, PipelineError, PipelineReport};
use tracing::{info, instrument};

use crate::workers::{FetchBlocks, StoreResults, TransformBlocks};

/// Stage names in pipeline order
pub const STAGE_NAMES: [&str; 3] = [
    FetchBlocks::STAGE_NAME,
    TransformBlocks::STAGE_NAME,
    StoreResults::STAGE_NAME,
];

/// Wire `Fetch Blocks -> Transform Blocks -> Store Results` from a blueprint
///
/// The generator emits `start_block, start_block + 1, ...`, bounded by
/// `max_blocks` when set.
#[instrument(
    name = "block_pipeline_build",
    skip(blueprint),
    fields(queue_capacity = blueprint.pipeline.queue_capacity, max_blocks = ?blueprint.max_blocks())
)]
pub fn block_pipeline(blueprint: &PipelineBlueprint) -> Result<Pipeline<BlockId>, PipelineError> {
    let stages = &blueprint.stages;
    let builder = PipelineBuilder::new(blueprint.pipeline.queue_capacity)
        .stage(FetchBlocks::STAGE_NAME, FetchBlocks::from_config(&stages.fetch))
        .stage(
            TransformBlocks::STAGE_NAME,
            TransformBlocks::from_config(&stages.transform),
        )
        .stage(StoreResults::STAGE_NAME, StoreResults::from_config(&stages.store));

    let source = BlockId::sequence(blueprint.generator.start_block);
    let pacing = blueprint.generator.pacing;

    match blueprint.max_blocks() {
        Some(limit) => {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            builder.build(source.take(limit), pacing)
        }
        None => builder.build(source, pacing),
    }
}

/// Build and run the block pipeline, blocking until it has fully shut down
///
/// Cancel `cancel` to stop the run (e.g. on an OS interrupt).
pub async fn start_pipeline(
    cancel: &CancellationToken,
    blueprint: &PipelineBlueprint,
) -> Result<PipelineReport, PipelineError> {
    let pipeline = block_pipeline(blueprint)?;
    info!(stages = ?pipeline.stage_names(), "Block pipeline assembled");
    pipeline.run(cancel).await
}
