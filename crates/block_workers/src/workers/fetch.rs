//! Fetch Blocks worker

define_block_worker!(
    FetchBlocks,
    "Fetch Blocks",
    fetch,
    "Fetched block",
    "fetch failure: unable to fetch block"
);
