/// Imagery availability checker
///
/// Each worker probes its units one by one. Network failures sleep on a
/// doubling schedule and retry the same unit; once the schedule is
/// exhausted the worker flushes what it has and stops with an error.
use crate::modules::imagery::domain::backoff::Backoff;
use crate::modules::imagery::domain::entities::{Availability, CandidateUnit};
use crate::modules::imagery::domain::probe::ImageryProbe;
use crate::modules::imagery::domain::repository::AvailabilityStore;
use crate::modules::imagery::infrastructure::{AvailabilityRepositoryImpl, StreetViewClient};
use crate::modules::jobs::{split_flat, StageReport, WorkerOutcome, WorkerPool};
use crate::shared::config::PipelineConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::shared::tally::Tally;
use crate::shared::utils::logger::LogContext;
use crate::{log_error, log_info, log_warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const RESULT_BATCH_SIZE: usize = 100;
pub const TEST_UNITS_PER_WORKER: i64 = 100;

pub struct AvailabilityChecker<S: AvailabilityStore> {
    store: S,
    probe: Arc<dyn ImageryProbe>,
    worker_id: usize,
    batch_size: usize,
}

impl<S: AvailabilityStore> AvailabilityChecker<S> {
    pub fn new(store: S, probe: Arc<dyn ImageryProbe>, worker_id: usize) -> Self {
        Self {
            store,
            probe,
            worker_id,
            batch_size: RESULT_BATCH_SIZE,
        }
    }

    pub async fn run(&mut self, units: &[CandidateUnit], cancel: &CancellationToken) -> AppResult<WorkerOutcome> {
        let mut tally = Tally::new();
        let mut pending: Vec<Availability> = Vec::with_capacity(self.batch_size);
        let mut backoff = Backoff::default();
        let mut index = 0;

        while let Some(unit) = units.get(index) {
            if cancel.is_cancelled() {
                self.flush(&mut pending, &mut tally).await;
                return Ok(WorkerOutcome::cancelled(self.worker_id, tally));
            }

            match self.probe.is_available(unit.lat, unit.lng).await {
                Ok(avail) => {
                    backoff.reset();
                    tally.incr(if avail { "available" } else { "unavailable" });
                    pending.push(Availability {
                        id: unit.id.clone(),
                        avail,
                    });
                    index += 1;
                }
                Err(AppError::NetworkError(message)) => {
                    tally.incr("network_errors");
                    let Some(delay) = backoff.next_delay() else {
                        self.flush(&mut pending, &mut tally).await;
                        log_error!(
                            "[imagery#{}] could not reach the metadata API, stopping after {} units ({})",
                            self.worker_id,
                            index,
                            tally
                        );
                        return Err(AppError::NetworkError(format!(
                            "imagery metadata unreachable: {}",
                            message
                        )));
                    };
                    log_warn!(
                        "[imagery#{}] {}, retrying {} in {:?}",
                        self.worker_id,
                        message,
                        unit.id,
                        delay
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                    continue;
                }
                Err(e) => {
                    log_error!("[imagery#{}] {} skipped: {}", self.worker_id, unit.id, e);
                    tally.incr("probe_errors");
                    if let Err(e) = self.store.reset() {
                        log_error!("[imagery#{}] connection reset failed: {}", self.worker_id, e);
                    }
                    index += 1;
                }
            }

            if pending.len() >= self.batch_size {
                self.flush(&mut pending, &mut tally).await;
                LogContext::worker_progress("imagery", self.worker_id, index, units.len(), "units");
            }
        }

        self.flush(&mut pending, &mut tally).await;
        Ok(WorkerOutcome::finished(self.worker_id, tally))
    }

    async fn flush(&mut self, pending: &mut Vec<Availability>, tally: &mut Tally) {
        if pending.is_empty() {
            return;
        }
        let batch = std::mem::take(pending);
        let size = batch.len();
        match self.store.upsert(batch).await {
            Ok(written) => tally.add("stored", written as u64),
            Err(e) => {
                log_error!("[imagery#{}] batch of {} lost: {}", self.worker_id, size, e);
                tally.add("store_failed", size as u64);
                if let Err(e) = self.store.reset() {
                    log_error!("[imagery#{}] connection reset failed: {}", self.worker_id, e);
                }
            }
        }
    }
}

/// Stage entry point.
pub async fn check_imagery(
    db: &Database,
    config: &PipelineConfig,
    num_workers: usize,
    test: bool,
    cancel: CancellationToken,
) -> AppResult<StageReport> {
    let api_key = config.require_google_key()?.to_string();
    let signing_secret = config.google_signing_secret.clone();
    if signing_secret.is_none() {
        log_warn!("GOOGLE_SIGNING_SECRET not set, imagery requests go out unsigned");
    }

    let limit = test.then(|| TEST_UNITS_PER_WORKER * num_workers.max(1) as i64);
    let candidates = AvailabilityRepositoryImpl::new(db.clone()).candidates(limit).await?;
    log_info!(
        "Checking imagery for {} units with {} workers",
        candidates.len(),
        num_workers
    );

    let splits = split_flat(candidates, num_workers);
    let database_url = db.url().to_string();

    let report = WorkerPool::new("imagery", cancel)
        .run_async(splits, move |split, cancel| {
            let database_url = database_url.clone();
            let api_key = api_key.clone();
            let signing_secret = signing_secret.clone();
            async move {
                let store = AvailabilityRepositoryImpl::new(Database::for_worker(&database_url)?);
                let probe = Arc::new(StreetViewClient::new(&api_key, signing_secret.as_deref())?);
                AvailabilityChecker::new(store, probe, split.id)
                    .run(&split.items, &cancel)
                    .await
            }
        })
        .await;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::imagery::domain::probe::MockImageryProbe;
    use crate::modules::imagery::domain::repository::MockAvailabilityStore;
    use std::time::Duration;
    use tokio::time::Instant;

    fn units(n: usize) -> Vec<CandidateUnit> {
        (0..n)
            .map(|i| CandidateUnit {
                id: format!("unit-{}", i),
                lat: 45.5,
                lng: -73.5,
            })
            .collect()
    }

    fn network_error() -> AppError {
        AppError::NetworkError("connection refused".into())
    }

    #[tokio::test]
    async fn results_are_batched() {
        let mut probe = MockImageryProbe::new();
        probe.expect_is_available().returning(|_, _| Ok(true));
        let mut store = MockAvailabilityStore::new();
        store
            .expect_upsert()
            .times(3)
            .returning(|batch| Ok(batch.len()));

        let mut checker = AvailabilityChecker::new(store, Arc::new(probe), 1);
        let outcome = checker.run(&units(250), &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.tally.get("available"), 250);
        assert_eq!(outcome.tally.get("stored"), 250);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_network_errors_exhaust_the_backoff() {
        let mut probe = MockImageryProbe::new();
        let mut calls = 0;
        probe.expect_is_available().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(false)
            } else {
                Err(network_error())
            }
        });
        let mut store = MockAvailabilityStore::new();
        store
            .expect_upsert()
            .withf(|batch| batch.len() == 1 && !batch[0].avail)
            .times(1)
            .returning(|batch| Ok(batch.len()));

        let started = Instant::now();
        let mut checker = AvailabilityChecker::new(store, Arc::new(probe), 1);
        let result = checker.run(&units(3), &CancellationToken::new()).await;

        assert!(matches!(result, Err(AppError::NetworkError(_))));
        let slept = started.elapsed();
        assert!(slept >= Duration::from_secs(63) && slept < Duration::from_secs(64));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_restarts_after_success() {
        let mut probe = MockImageryProbe::new();
        let mut calls = 0;
        probe.expect_is_available().returning(move |_, _| {
            calls += 1;
            if calls % 2 == 1 {
                Err(network_error())
            } else {
                Ok(true)
            }
        });
        let mut store = MockAvailabilityStore::new();
        store.expect_upsert().returning(|batch| Ok(batch.len()));

        let started = Instant::now();
        let mut checker = AvailabilityChecker::new(store, Arc::new(probe), 1);
        let outcome = checker.run(&units(2), &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.tally.get("available"), 2);
        assert_eq!(outcome.tally.get("network_errors"), 2);
        let slept = started.elapsed();
        assert!(slept >= Duration::from_secs(2) && slept < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn unexpected_error_resets_and_skips_unit() {
        let mut probe = MockImageryProbe::new();
        let mut calls = 0;
        probe.expect_is_available().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(AppError::SerializationError("unexpected body".into()))
            } else {
                Ok(true)
            }
        });
        let mut store = MockAvailabilityStore::new();
        store.expect_reset().times(1).returning(|| Ok(()));
        store
            .expect_upsert()
            .withf(|batch| batch.len() == 1 && batch[0].id == "unit-1")
            .returning(|batch| Ok(batch.len()));

        let mut checker = AvailabilityChecker::new(store, Arc::new(probe), 1);
        let outcome = checker.run(&units(2), &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.tally.get("probe_errors"), 1);
        assert_eq!(outcome.tally.get("stored"), 1);
    }

    #[tokio::test]
    async fn cancellation_flushes_pending_results() {
        let token = CancellationToken::new();
        let mut probe = MockImageryProbe::new();
        let cancel_after_first = token.clone();
        probe.expect_is_available().returning(move |_, _| {
            cancel_after_first.cancel();
            Ok(true)
        });
        let mut store = MockAvailabilityStore::new();
        store
            .expect_upsert()
            .times(1)
            .returning(|batch| Ok(batch.len()));

        let mut checker = AvailabilityChecker::new(store, Arc::new(probe), 1);
        let outcome = checker.run(&units(5), &token).await.unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.tally.get("stored"), 1);
    }
}
