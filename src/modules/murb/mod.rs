/// MURB aggregation engine
///
/// - Domain: cluster entity, field mergers, aggregate builder
/// - Infrastructure: cluster queries and the transactional replace
/// - Application: single-worker stage
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::aggregation_service::{aggregate_murbs, MurbAggregationService};
pub use domain::aggregator::MurbAggregator;
pub use domain::repository::MurbStore;
