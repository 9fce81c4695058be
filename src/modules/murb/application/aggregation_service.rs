/// MURB aggregation
///
/// Residential rows sharing a point, an address and a municipality are one
/// building entered once per apartment. Each cluster is replaced by a
/// synthetic aggregate; the originals move to the archive table.
use crate::modules::jobs::StageReport;
use crate::modules::murb::domain::aggregator::MurbAggregator;
use crate::modules::murb::domain::entities::Cluster;
use crate::modules::murb::domain::repository::MurbStore;
use crate::modules::murb::infrastructure::repository::MurbRepositoryImpl;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::shared::tally::Tally;
use crate::shared::utils::logger::{LogContext, TimedOperation};
use crate::{log_error, log_info, log_warn};
use tokio_util::sync::CancellationToken;

/// Clusters per worker-equivalent in test mode.
pub const TEST_CLUSTERS_PER_WORKER: i64 = 10;
const PROGRESS_EVERY_CLUSTERS: usize = 500;

pub struct MurbAggregationService<S: MurbStore> {
    store: S,
    aggregator: MurbAggregator,
}

impl<S: MurbStore> MurbAggregationService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            aggregator: MurbAggregator::new(),
        }
    }

    /// Aggregate every cluster. Returns the tally and whether the run was
    /// interrupted.
    pub fn run(&mut self, limit: Option<i64>, cancel: &CancellationToken) -> AppResult<(Tally, bool)> {
        let clusters = self.store.clusters(limit)?;
        let total = clusters.len();
        log_info!("Found {} duplicate residential clusters", total);

        let mut tally = Tally::new();
        for (done, cluster) in clusters.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok((tally, true));
            }

            if let Err(e) = self.aggregate_cluster(cluster, &mut tally) {
                log_error!(
                    "[murb] cluster '{}' ({}) failed: {}",
                    cluster.address,
                    cluster.muni,
                    e
                );
                tally.incr("clusters_failed");
                if let Err(e) = self.store.reset() {
                    log_error!("[murb] connection reset failed: {}", e);
                }
            }

            if (done + 1) % PROGRESS_EVERY_CLUSTERS == 0 {
                LogContext::worker_progress("murb", 1, done + 1, total, "clusters");
            }
        }

        Ok((tally, false))
    }

    fn aggregate_cluster(&mut self, cluster: &Cluster, tally: &mut Tally) -> AppResult<()> {
        let members = self.store.members(cluster)?;
        if members.len() < 2 {
            log_warn!(
                "[murb] cluster '{}' ({}) has {} live members, skipped",
                cluster.address,
                cluster.muni,
                members.len()
            );
            tally.incr("clusters_skipped");
            return Ok(());
        }

        let aggregate = self.aggregator.aggregate(&members)?;
        let member_ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
        let outcome = self.store.replace_with_aggregate(&aggregate, &member_ids)?;

        tally.incr("clusters");
        tally.add("aggregates_inserted", outcome.inserted as u64);
        tally.add("members_archived", outcome.archived as u64);
        tally.add("members_deleted", outcome.deleted as u64);
        Ok(())
    }
}

/// Stage entry point. Runs on a single worker.
pub async fn aggregate_murbs(
    db: &Database,
    num_workers: usize,
    test: bool,
    cancel: CancellationToken,
) -> AppResult<StageReport> {
    let database_url = db.url().to_string();
    let limit = test.then(|| TEST_CLUSTERS_PER_WORKER * num_workers.max(1) as i64);

    let timer = TimedOperation::new("aggregate_murbs");
    let (tally, cancelled) = tokio::task::spawn_blocking(move || {
        let store = MurbRepositoryImpl::new(Database::for_worker(&database_url)?);
        MurbAggregationService::new(store).run(limit, &cancel)
    })
    .await
    .map_err(AppError::from)??;

    let mut report = StageReport::single("murb", tally, cancelled);
    report.elapsed_ms = timer.finish();
    LogContext::stage_summary("murb", &report.tally.to_string());
    Ok(report)
}
