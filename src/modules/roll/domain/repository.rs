use super::eval_unit::EvalUnit;
use crate::shared::errors::AppResult;

/// Per-worker view of the evaluation-unit registry used during ingestion.
///
/// Calls are blocking: ingestion workers run on the blocking thread pool and
/// own their connection.
#[cfg_attr(test, mockall::automock)]
pub trait EvalUnitStore: Send {
    /// Whether a unit with this composite id is already stored.
    fn exists(&self, id: &str) -> AppResult<bool>;

    /// Bulk insert, ignoring ids that already exist. Returns rows written.
    fn insert_batch(&self, units: &[EvalUnit]) -> AppResult<usize>;

    /// Drop and reopen the underlying connection.
    fn reset(&mut self) -> AppResult<()>;
}
