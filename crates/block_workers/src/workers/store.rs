//! Store Results worker

define_block_worker!(
    StoreResults,
    "Store Results",
    store,
    "Stored block",
    "store failure: database unavailable"
);
