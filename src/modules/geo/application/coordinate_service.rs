/// Coordinate assignment
///
/// Each worker reads one contiguous index range of the point dataset and
/// writes longitude, latitude and a point geometry onto the matching unit.
use crate::modules::geo::domain::entities::UnitPoint;
use crate::modules::geo::domain::repository::CoordinateStore;
use crate::modules::geo::infrastructure::point_reader::{count_points, PointRangeReader};
use crate::modules::geo::infrastructure::repository::GeoRepositoryImpl;
use crate::modules::jobs::{split_index_range, StageReport, WorkerOutcome, WorkerPool};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::shared::tally::Tally;
use crate::shared::utils::logger::LogContext;
use crate::{log_error, log_info, log_warn};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Rows per worker in test mode.
pub const TEST_POINTS_PER_WORKER: usize = 500;
const PROGRESS_EVERY_POINTS: usize = 10_000;

pub struct CoordinateService<S: CoordinateStore> {
    store: S,
    worker_id: usize,
}

impl<S: CoordinateStore> CoordinateService<S> {
    pub fn new(store: S, worker_id: usize) -> Self {
        Self { store, worker_id }
    }

    /// Apply every row the iterator yields. Malformed rows and failed
    /// updates are counted and skipped.
    pub fn run<I>(&mut self, points: I, total: usize, cancel: &CancellationToken) -> WorkerOutcome
    where
        I: IntoIterator<Item = AppResult<UnitPoint>>,
    {
        let mut tally = Tally::new();

        for (done, row) in points.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return WorkerOutcome::cancelled(self.worker_id, tally);
            }

            let point = match row {
                Ok(point) => point,
                Err(e) => {
                    log_warn!("[coords#{}] bad row skipped: {}", self.worker_id, e);
                    tally.incr("bad_rows");
                    continue;
                }
            };

            match self.store.set_coordinates(&point.id, point.lng, point.lat) {
                Ok(true) => tally.incr("assigned"),
                Ok(false) => tally.incr("unknown_unit"),
                Err(e) => {
                    log_error!("[coords#{}] {}: {}", self.worker_id, point.id, e);
                    tally.incr("update_failed");
                    if let Err(e) = self.store.reset() {
                        log_error!("[coords#{}] connection reset failed: {}", self.worker_id, e);
                    }
                }
            }

            if (done + 1) % PROGRESS_EVERY_POINTS == 0 {
                LogContext::worker_progress("coords", self.worker_id, done + 1, total, "points");
            }
        }

        WorkerOutcome::finished(self.worker_id, tally)
    }
}

/// Test mode keeps the head of each worker's range.
fn limit_range(range: Range<usize>, test: bool) -> Range<usize> {
    if test {
        range.start..range.end.min(range.start + TEST_POINTS_PER_WORKER)
    } else {
        range
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinateOptions {
    pub num_workers: usize,
    pub test: bool,
}

/// Stage entry point. Outside test mode, units still lacking coordinates
/// afterwards are deleted.
pub async fn assign_coordinates(
    db: &Database,
    points_file: &Path,
    options: CoordinateOptions,
    cancel: CancellationToken,
) -> AppResult<StageReport> {
    if !points_file.is_file() {
        return Err(AppError::NotFound(format!(
            "Point dataset {} not found",
            points_file.display()
        )));
    }

    let total = count_points(points_file)?;
    log_info!(
        "Assigning coordinates from {} rows with {} workers",
        total,
        options.num_workers
    );

    let splits = split_index_range(total, options.num_workers);
    let database_url = db.url().to_string();
    let path: PathBuf = points_file.to_path_buf();
    let test = options.test;

    let mut report = WorkerPool::new("coords", cancel)
        .run_blocking(splits, move |split, cancel| {
            let range = split.items.first().cloned().unwrap_or(0..0);
            let range = limit_range(range, test);
            let len = range.len();
            let points = PointRangeReader::open(&path, range)?;
            let store = GeoRepositoryImpl::new(Database::for_worker(&database_url)?);
            Ok(CoordinateService::new(store, split.id).run(points, len, &cancel))
        })
        .await;

    if !report.cancelled && !options.test {
        let deleted = GeoRepositoryImpl::new(db.clone()).delete_without_coordinates()?;
        log_info!("Deleted {} units without coordinates", deleted);
        report.tally.add("deleted_without_coords", deleted as u64);
    }

    Ok(report)
}
