/// Lot linking
///
/// Single worker: lots are walked in `gid` descending chunks. A lot naming
/// one unit links it directly; a lot flagged as covering several units
/// links every unit whose point it contains.
use crate::modules::geo::domain::entities::{Lot, LotTarget};
use crate::modules::geo::domain::repository::LotStore;
use crate::modules::geo::infrastructure::repository::GeoRepositoryImpl;
use crate::modules::jobs::StageReport;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::shared::tally::Tally;
use crate::shared::utils::logger::{LogContext, TimedOperation};
use crate::{log_error, log_info};
use tokio_util::sync::CancellationToken;

pub const LOT_CHUNKS: i64 = 100;
pub const TEST_LOT_CHUNKS: i64 = 2;

pub struct LotLinker<S: LotStore> {
    store: S,
}

impl<S: LotStore> LotLinker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Link lots chunk by chunk. Returns the tally and whether the run was
    /// interrupted.
    pub fn run(&mut self, test: bool, cancel: &CancellationToken) -> AppResult<(Tally, bool)> {
        let mut tally = Tally::new();
        let total = self.store.count_lots()?;
        if total == 0 {
            return Ok((tally, false));
        }

        let chunk_size = chunk_size(total, LOT_CHUNKS);
        let chunks = if test { TEST_LOT_CHUNKS } else { LOT_CHUNKS };

        for chunk in 0..chunks {
            if cancel.is_cancelled() {
                return Ok((tally, true));
            }

            let lots = match self.store.lot_page(chunk_size, chunk * chunk_size) {
                Ok(lots) => lots,
                Err(e) => {
                    log_error!("[lots] chunk {} failed: {}", chunk, e);
                    tally.incr("chunks_failed");
                    self.reset_store();
                    continue;
                }
            };
            if lots.is_empty() {
                break;
            }

            for lot in &lots {
                if cancel.is_cancelled() {
                    return Ok((tally, true));
                }
                self.link(lot, &mut tally);
            }

            LogContext::worker_progress("lots", 1, (chunk + 1) as usize, chunks as usize, "chunks");
        }

        Ok((tally, false))
    }

    fn link(&mut self, lot: &Lot, tally: &mut Tally) {
        let result = match lot.target() {
            LotTarget::Unit(id) => self.store.link_unit(lot.gid, id),
            LotTarget::Multiple => self.store.link_contained_units(lot.gid),
            LotTarget::Unknown => {
                tally.incr("lots_without_id");
                return;
            }
        };

        match result {
            Ok(0) => tally.incr("lots_unmatched"),
            Ok(linked) => {
                tally.incr("lots_linked");
                tally.add("units_linked", linked as u64);
            }
            Err(e) => {
                log_error!("[lots] lot {} failed: {}", lot.gid, e);
                tally.incr("lots_failed");
                self.reset_store();
            }
        }
    }

    fn reset_store(&mut self) {
        if let Err(e) = self.store.reset() {
            log_error!("[lots] connection reset failed: {}", e);
        }
    }
}

/// `ceil(total / chunks)`, at least 1.
pub fn chunk_size(total: i64, chunks: i64) -> i64 {
    ((total + chunks - 1) / chunks.max(1)).max(1)
}

/// Stage entry point.
pub async fn link_lots(db: &Database, test: bool, cancel: CancellationToken) -> AppResult<StageReport> {
    let database_url = db.url().to_string();
    log_info!("Linking lots to units");

    let timer = TimedOperation::new("link_lots");
    let (tally, cancelled) = tokio::task::spawn_blocking(move || {
        let store = GeoRepositoryImpl::new(Database::for_worker(&database_url)?);
        LotLinker::new(store).run(test, &cancel)
    })
    .await
    .map_err(AppError::from)??;

    let mut report = StageReport::single("lots", tally, cancelled);
    report.elapsed_ms = timer.finish();
    LogContext::stage_summary("lots", &report.tally.to_string());
    Ok(report)
}
