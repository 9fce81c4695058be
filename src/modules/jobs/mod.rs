/// Worker system shared by every stage
///
/// - Domain: work splits, partitioning, stage reports
/// - Worker: pool running one task per split, plus Ctrl-C cancellation
/// - Concurrency: default worker count
pub mod concurrency;
pub mod domain;
pub mod worker;

// Re-exports for easy access
pub use concurrency::ConcurrencyCalculator;
pub use domain::{
    entities::{StageReport, WorkSplit, WorkerOutcome},
    partitioner::{split_by_size, split_flat, split_index_range},
};
pub use worker::{cancel_on_ctrl_c, WorkerPool};
