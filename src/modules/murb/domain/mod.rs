pub mod aggregator;
pub mod entities;
pub mod field_mergers;
pub mod repository;

pub use entities::{ArchiveOutcome, Cluster};
pub use field_mergers::{average_present, infer_floors, round2, sum_present, vote, FieldMerger};
