//! Block worker macros
//!
//! The three workers differ only in naming, log wording and failure message.

/// Define a simulated block worker
///
/// Generates the worker struct, its constructors and the `Worker<BlockId>`
/// implementation: log the block, sleep for a sampled latency (cut short by
/// cancellation), then fail when the block number is a multiple of `fail_every`.
///
/// # Usage
/// ```ignore
/// define_block_worker!(
///     FetchBlocks,                            // Worker name
///     "Fetch Blocks",                         // Stage name
///     fetch,                                  // Field of `StagesConfig`
///     "Fetched block",                        // Log message
///     "fetch failure: unable to fetch block"  // Failure message
/// );
/// ```
macro_rules! define_block_worker {
    (
        $worker:ident,
        $stage_name:literal,
        $config_field:ident,
        $done_message:literal,
        $failure_message:literal
    ) => {
        use contracts::{
            pause, BlockId, CancellationToken, Pacing, StagesConfig, WorkFailure, Worker,
            WorkerConfig,
        };
        use tracing::{debug, info};

        #[derive(Debug, Clone, PartialEq)]
        pub struct $worker {
            latency: Pacing,
            fail_every: u64,
        }

        impl $worker {
            /// Stage name used in logs, metrics and error reports
            pub const STAGE_NAME: &'static str = $stage_name;

            pub fn new(latency: Pacing, fail_every: u64) -> Self {
                Self {
                    latency,
                    fail_every,
                }
            }

            pub fn from_config(config: &WorkerConfig) -> Self {
                Self::new(config.latency, config.fail_every)
            }

            /// Never fails, never sleeps
            pub fn reliable() -> Self {
                Self::new(Pacing::Immediate, 0)
            }

            pub fn latency(&self) -> Pacing {
                self.latency
            }

            pub fn fail_every(&self) -> u64 {
                self.fail_every
            }
        }

        impl Default for $worker {
            fn default() -> Self {
                Self::from_config(&StagesConfig::default().$config_field)
            }
        }

        impl Worker<BlockId> for $worker {
            async fn process(
                &self,
                cancel: &CancellationToken,
                block: &BlockId,
            ) -> Result<(), WorkFailure> {
                info!(stage = Self::STAGE_NAME, block = %block, "{}", $done_message);

                if !pause(cancel, self.latency.sample()).await {
                    debug!(stage = Self::STAGE_NAME, block = %block, "Cancelled during simulated work");
                    return Ok(());
                }

                if block.is_multiple_of(self.fail_every) {
                    return Err(WorkFailure::new($failure_message));
                }

                Ok(())
            }
        }
    };
}
