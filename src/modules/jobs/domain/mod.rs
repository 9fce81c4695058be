pub mod entities;
pub mod partitioner;

pub use entities::{StageReport, WorkSplit, WorkerOutcome};
pub use partitioner::{split_by_size, split_flat, split_index_range};
