/// Worker pool for the pipeline stages
///
/// Every stage statically partitions its input, then hands one `WorkSplit`
/// to each worker. CPU and database bound stages run on the blocking thread
/// pool; HTTP bound stages run as async tasks. Workers share nothing: each
/// opens its own database pool and clients in its init step.
use crate::modules::jobs::domain::entities::{StageReport, WorkSplit, WorkerOutcome};
use crate::shared::errors::AppResult;
use crate::shared::utils::logger::LogContext;
use crate::{log_debug, log_error, log_warn};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type WorkerHandle = (usize, JoinHandle<AppResult<WorkerOutcome>>);

pub struct WorkerPool {
    stage: String,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(stage: &str, cancel: CancellationToken) -> Self {
        Self {
            stage: stage.to_string(),
            cancel,
        }
    }

    /// Run blocking workers, one per split, on tokio's blocking pool.
    pub async fn run_blocking<T, F>(&self, splits: Vec<WorkSplit<T>>, work: F) -> StageReport
    where
        T: Send + 'static,
        F: Fn(WorkSplit<T>, CancellationToken) -> AppResult<WorkerOutcome> + Send + Sync + 'static,
    {
        let started = Instant::now();
        let work = Arc::new(work);

        let handles: Vec<WorkerHandle> = splits
            .into_iter()
            .map(|split| {
                let work = Arc::clone(&work);
                let cancel = self.cancel.clone();
                let worker_id = split.id;
                log_debug!(
                    "[{}#{}] starting with {} items (load {})",
                    self.stage,
                    worker_id,
                    split.len(),
                    split.load
                );
                (
                    worker_id,
                    tokio::task::spawn_blocking(move || work(split, cancel)),
                )
            })
            .collect();

        self.collect(handles, started).await
    }

    /// Run async workers, one per split, as tokio tasks.
    pub async fn run_async<T, F, Fut>(&self, splits: Vec<WorkSplit<T>>, work: F) -> StageReport
    where
        T: Send + 'static,
        F: Fn(WorkSplit<T>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<WorkerOutcome>> + Send + 'static,
    {
        let started = Instant::now();

        let handles: Vec<WorkerHandle> = splits
            .into_iter()
            .map(|split| {
                let worker_id = split.id;
                log_debug!(
                    "[{}#{}] starting with {} items",
                    self.stage,
                    worker_id,
                    split.len()
                );
                (worker_id, tokio::spawn(work(split, self.cancel.clone())))
            })
            .collect();

        self.collect(handles, started).await
    }

    /// Wait for every worker. A failed worker is logged and counted; it
    /// never stops its siblings.
    async fn collect(&self, handles: Vec<WorkerHandle>, started: Instant) -> StageReport {
        let mut report = StageReport::new(&self.stage);
        let results = join_all(
            handles
                .into_iter()
                .map(|(worker_id, handle)| async move { (worker_id, handle.await) }),
        )
        .await;

        for (worker_id, result) in results {
            match result {
                Ok(Ok(outcome)) => {
                    if outcome.cancelled {
                        log_warn!("[{}#{}] interrupted, partial counts kept", self.stage, worker_id);
                    }
                    report.absorb(&outcome);
                }
                Ok(Err(e)) => {
                    log_error!("[{}#{}] worker failed: {}", self.stage, worker_id, e);
                    report.workers += 1;
                    report.failed_workers += 1;
                }
                Err(e) => {
                    log_error!("[{}#{}] worker panicked: {}", self.stage, worker_id, e);
                    report.workers += 1;
                    report.failed_workers += 1;
                }
            }
        }

        report.cancelled |= self.cancel.is_cancelled();
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        LogContext::stage_summary(&self.stage, &report.tally.to_string());
        report
    }
}

/// Cancel `token` on the first Ctrl-C. Workers notice it at their next
/// loop boundary.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log_warn!("Interrupt received, stopping workers after their current item");
            token.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::jobs::domain::partitioner::split_flat;
    use crate::shared::errors::AppError;
    use crate::shared::tally::Tally;

    #[tokio::test]
    async fn blocking_workers_merge_tallies() {
        let pool = WorkerPool::new("sum", CancellationToken::new());
        let splits = split_flat((1..=10u64).collect(), 3);

        let report = pool
            .run_blocking(splits, |split, _cancel| {
                let mut tally = Tally::new();
                tally.add("items", split.len() as u64);
                tally.add("sum", split.items.iter().sum());
                Ok(WorkerOutcome::finished(split.id, tally))
            })
            .await;

        assert_eq!(report.workers, 3);
        assert_eq!(report.failed_workers, 0);
        assert_eq!(report.tally.get("items"), 10);
        assert_eq!(report.tally.get("sum"), 55);
    }

    #[tokio::test]
    async fn failing_worker_does_not_stop_siblings() {
        let pool = WorkerPool::new("flaky", CancellationToken::new());
        let splits = split_flat(vec![1, 2, 3, 4], 2);

        let report = pool
            .run_async(splits, |split, _cancel| async move {
                if split.id == 1 {
                    return Err(AppError::NetworkError("unreachable".into()));
                }
                let mut tally = Tally::new();
                tally.add("done", split.len() as u64);
                Ok(WorkerOutcome::finished(split.id, tally))
            })
            .await;

        assert_eq!(report.workers, 2);
        assert_eq!(report.failed_workers, 1);
        assert_eq!(report.tally.get("done"), 2);
    }

    #[tokio::test]
    async fn cancelled_token_marks_report() {
        let token = CancellationToken::new();
        token.cancel();
        let pool = WorkerPool::new("stopped", token);

        let report = pool
            .run_blocking(split_flat(vec![1, 2], 1), |split, cancel| {
                let mut tally = Tally::new();
                for _ in &split.items {
                    if cancel.is_cancelled() {
                        return Ok(WorkerOutcome::cancelled(split.id, tally));
                    }
                    tally.incr("processed");
                }
                Ok(WorkerOutcome::finished(split.id, tally))
            })
            .await;

        assert!(report.cancelled);
        assert_eq!(report.tally.get("processed"), 0);
    }
}
