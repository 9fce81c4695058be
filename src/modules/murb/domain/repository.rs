use super::entities::{ArchiveOutcome, Cluster};
use crate::modules::roll::EvalUnit;
use crate::shared::errors::AppResult;

#[cfg_attr(test, mockall::automock)]
pub trait MurbStore: Send {
    /// Duplicate clusters, smallest first. Aggregates already written are
    /// never part of a cluster.
    fn clusters(&self, limit: Option<i64>) -> AppResult<Vec<Cluster>>;

    fn members(&self, cluster: &Cluster) -> AppResult<Vec<EvalUnit>>;

    /// Insert the aggregate, archive the members under its id and delete
    /// them, in one transaction. Every step tolerates a previous partial run.
    fn replace_with_aggregate(&self, aggregate: &EvalUnit, member_ids: &[String]) -> AppResult<ArchiveOutcome>;

    fn reset(&mut self) -> AppResult<()>;
}
