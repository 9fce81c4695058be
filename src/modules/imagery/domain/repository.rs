use super::entities::{Availability, CandidateUnit};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Units with a candidate land-use code and coordinates, by id.
    async fn candidates(&self, limit: Option<i64>) -> AppResult<Vec<CandidateUnit>>;

    /// Insert or overwrite cached results.
    async fn upsert(&self, results: Vec<Availability>) -> AppResult<usize>;

    fn reset(&mut self) -> AppResult<()>;
}
