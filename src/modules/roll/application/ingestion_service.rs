/// Streaming roll ingestion
///
/// Each worker walks its documents one unit subtree at a time, filters by
/// land-use code before any other extraction, skips ids already stored and
/// flushes parsed units in fixed-size batches.
use crate::modules::datasets::find_files;
use crate::modules::jobs::{split_by_size, StageReport, WorkSplit, WorkerOutcome, WorkerPool};
use crate::modules::roll::domain::codes::is_kept_cubf;
use crate::modules::roll::domain::eval_unit::EvalUnit;
use crate::modules::roll::domain::repository::EvalUnitStore;
use crate::modules::roll::infrastructure::repository::EvalUnitRepositoryImpl;
use crate::modules::roll::infrastructure::unit_parser::{
    parse_cubf, parse_derived_code, parse_unit, unit_key,
};
use crate::modules::roll::infrastructure::xml_reader::{DocumentHeader, RollDocumentReader, XmlNode};
use crate::shared::config::MunicipalityTable;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::shared::tally::Tally;
use crate::shared::utils::logger::LogContext;
use crate::{log_error, log_info, log_warn};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const INGEST_BATCH_SIZE: usize = 1000;
const PROGRESS_EVERY_UNITS: u64 = 5_000;

enum UnitOutcome {
    Parsed(Box<EvalUnit>),
    Skipped(&'static str),
}

pub struct RollIngestionService<S: EvalUnitStore> {
    store: S,
    municipalities: Arc<MunicipalityTable>,
    worker_id: usize,
    batch_size: usize,
}

impl<S: EvalUnitStore> RollIngestionService<S> {
    pub fn new(store: S, municipalities: Arc<MunicipalityTable>, worker_id: usize) -> Self {
        Self {
            store,
            municipalities,
            worker_id,
            batch_size: INGEST_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Process every document of the split. Returns partial counts when
    /// cancelled.
    pub fn run(&mut self, split: &WorkSplit<PathBuf>, cancel: &CancellationToken) -> WorkerOutcome {
        let mut tally = Tally::new();
        let mut bytes_done: u64 = 0;

        for path in &split.items {
            if cancel.is_cancelled() {
                return WorkerOutcome::cancelled(self.worker_id, tally);
            }

            let reader = match RollDocumentReader::open(path) {
                Ok(reader) => reader,
                Err(e) => {
                    log_error!("[ingest#{}] cannot open {}: {}", self.worker_id, path.display(), e);
                    tally.incr("documents_failed");
                    continue;
                }
            };

            let consumed = self.ingest_document(reader, cancel, &mut tally, bytes_done, split.load);
            bytes_done += consumed;

            if cancel.is_cancelled() {
                return WorkerOutcome::cancelled(self.worker_id, tally);
            }
        }

        WorkerOutcome::finished(self.worker_id, tally)
    }

    /// Ingest one document; the reader is consumed and released on every
    /// exit path. Returns the number of bytes read.
    pub fn ingest_document<R: BufRead>(
        &mut self,
        mut reader: RollDocumentReader<R>,
        cancel: &CancellationToken,
        tally: &mut Tally,
        bytes_before: u64,
        bytes_total: u64,
    ) -> u64 {
        let header = match reader.read_header() {
            Ok(header) => header,
            Err(e) => {
                log_error!("[ingest#{}] {}", self.worker_id, e);
                tally.incr("documents_failed");
                return reader.position();
            }
        };
        let muni = self.municipalities.resolve(&header.muni_code);
        let mut batch: Vec<EvalUnit> = Vec::with_capacity(self.batch_size);
        let mut seen: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let node = match reader.next_unit() {
                Ok(Some(node)) => node,
                Ok(None) => break,
                Err(e) => {
                    log_error!(
                        "[ingest#{}] {} near byte {}: {}",
                        self.worker_id,
                        reader.label(),
                        reader.position(),
                        e
                    );
                    tally.incr("documents_failed");
                    break;
                }
            };

            seen += 1;
            tally.incr("units_seen");

            match self.process_unit(&header, &muni, &node) {
                Ok(UnitOutcome::Parsed(unit)) => batch.push(*unit),
                Ok(UnitOutcome::Skipped(reason)) => tally.incr(reason),
                Err(e) => {
                    log_warn!(
                        "[ingest#{}] {} near byte {}: unit skipped: {}",
                        self.worker_id,
                        reader.label(),
                        reader.position(),
                        e
                    );
                    tally.incr("parse_errors");
                    if matches!(e, AppError::DatabaseError(_)) {
                        self.reset_store();
                    }
                }
            }

            if batch.len() >= self.batch_size {
                self.flush(&mut batch, tally);
            }

            if seen % PROGRESS_EVERY_UNITS == 0 {
                LogContext::worker_progress(
                    "ingest",
                    self.worker_id,
                    (bytes_before + reader.position()) as usize,
                    bytes_total as usize,
                    "bytes",
                );
            }
        }

        // End of document, error or interrupt: whatever is parsed gets written.
        self.flush(&mut batch, tally);
        tally.incr("documents");
        reader.position()
    }

    fn process_unit(&self, header: &DocumentHeader, muni: &str, node: &XmlNode) -> AppResult<UnitOutcome> {
        let cubf = parse_cubf(node)?;
        if !is_kept_cubf(cubf) {
            return Ok(UnitOutcome::Skipped("skipped_cubf"));
        }

        let code = parse_derived_code(node)?;
        if code.is_aggregate() {
            return Ok(UnitOutcome::Skipped("reserved_suffix"));
        }

        let key = unit_key(header, muni, code, cubf)?;
        if self.store.exists(&key.id)? {
            return Ok(UnitOutcome::Skipped("already_present"));
        }

        parse_unit(node, key).map(|unit| UnitOutcome::Parsed(Box::new(unit)))
    }

    fn flush(&mut self, batch: &mut Vec<EvalUnit>, tally: &mut Tally) {
        if batch.is_empty() {
            return;
        }
        match self.store.insert_batch(batch) {
            Ok(written) => tally.add("inserted", written as u64),
            Err(e) => {
                log_error!("[ingest#{}] batch of {} lost: {}", self.worker_id, batch.len(), e);
                tally.add("insert_failed", batch.len() as u64);
                self.reset_store();
            }
        }
        batch.clear();
    }

    fn reset_store(&mut self) {
        if let Err(e) = self.store.reset() {
            log_error!("[ingest#{}] connection reset failed: {}", self.worker_id, e);
        }
    }
}

/// In test mode keep the `10n..30n` smallest documents.
pub fn select_documents(
    mut documents: Vec<(PathBuf, u64)>,
    num_workers: usize,
    test: bool,
) -> Vec<(PathBuf, u64)> {
    if !test {
        return documents;
    }
    documents.sort_by_key(|(_, size)| *size);
    let start = 10 * num_workers;
    let end = (30 * num_workers).min(documents.len());
    if start >= end {
        log_warn!(
            "Only {} documents available, test mode uses all of them",
            documents.len()
        );
        return documents;
    }
    documents[start..end].to_vec()
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub num_workers: usize,
    pub test: bool,
}

/// Stage entry point: partition documents by size, ingest in parallel,
/// then drop units without any street number.
pub async fn ingest_roll(
    db: &Database,
    data_dir: &Path,
    municipalities: Arc<MunicipalityTable>,
    options: IngestOptions,
    cancel: CancellationToken,
) -> AppResult<StageReport> {
    let documents = select_documents(find_files(data_dir, "xml")?, options.num_workers, options.test);
    if documents.is_empty() {
        return Err(AppError::NotFound(format!(
            "No roll documents in {}",
            data_dir.display()
        )));
    }
    log_info!(
        "Ingesting {} roll documents with {} workers",
        documents.len(),
        options.num_workers
    );

    let splits = split_by_size(documents, options.num_workers);
    let database_url = db.url().to_string();

    let mut report = WorkerPool::new("ingest", cancel)
        .run_blocking(splits, move |split, cancel| {
            let store = EvalUnitRepositoryImpl::new(Database::for_worker(&database_url)?);
            let mut service =
                RollIngestionService::new(store, Arc::clone(&municipalities), split.id);
            Ok(service.run(&split, &cancel))
        })
        .await;

    if !report.cancelled {
        let deleted = EvalUnitRepositoryImpl::new(db.clone()).delete_without_street_number()?;
        log_info!("Deleted {} units without street numbers", deleted);
        report.tally.add("deleted_without_street_number", deleted as u64);
    }

    Ok(report)
}
