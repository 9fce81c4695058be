/// Streaming roll ingestion
///
/// - Domain: evaluation unit, derived code, address assembly, code tables
/// - Infrastructure: streaming XML reader, unit field parser, Diesel repository
/// - Application: per-worker ingestion service and the stage entry point
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::ingestion_service::{ingest_roll, IngestOptions, RollIngestionService};
pub use domain::eval_unit::EvalUnit;
pub use domain::repository::EvalUnitStore;
pub use infrastructure::repository::EvalUnitRepositoryImpl;
