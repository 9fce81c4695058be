/// Public-housing cross-referencing
///
/// Each worker takes raw CSV rows and runs them through parse, filter,
/// name resolution, geocoding and the spatial match cascade. Every
/// geocoded record is persisted, matched or not.
use crate::modules::crossref::domain::cascade::match_unit;
use crate::modules::crossref::domain::entities::{GeocodeQuery, GeocodeResult, HousingBuilding};
use crate::modules::crossref::domain::geocoder::Geocoder;
use crate::modules::crossref::domain::housing_record::HousingRecord;
use crate::modules::crossref::domain::repository::{MatchStore, RegistryLookup};
use crate::modules::crossref::domain::resolver::NameResolver;
use crate::modules::crossref::infrastructure::{
    load_rows, CrossrefRepositoryImpl, GoogleGeocoder, HousingRow, MapboxGeocoder,
};
use crate::modules::imagery::domain::probe::ImageryProbe;
use crate::modules::imagery::infrastructure::StreetViewClient;
use crate::modules::jobs::{split_flat, StageReport, WorkerOutcome, WorkerPool};
use crate::shared::config::PipelineConfig;
use crate::shared::errors::AppResult;
use crate::shared::infrastructure::Database;
use crate::shared::tally::Tally;
use crate::shared::utils::logger::LogContext;
use crate::{log_error, log_info, log_warn};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_WORKERS: usize = 2;
pub const TEST_ROWS_PER_WORKER: usize = 25;
const PROGRESS_EVERY_ROWS: usize = 50;

pub struct CrossrefWorker<L: RegistryLookup, S: MatchStore> {
    resolver: NameResolver<L>,
    store: S,
    primary: Arc<dyn Geocoder>,
    fallback: Arc<dyn Geocoder>,
    imagery: Arc<dyn ImageryProbe>,
    worker_id: usize,
}

impl<L: RegistryLookup, S: MatchStore> CrossrefWorker<L, S> {
    pub fn new(
        lookup: L,
        store: S,
        primary: Arc<dyn Geocoder>,
        fallback: Arc<dyn Geocoder>,
        imagery: Arc<dyn ImageryProbe>,
        worker_id: usize,
    ) -> Self {
        Self {
            resolver: NameResolver::new(lookup),
            store,
            primary,
            fallback,
            imagery,
            worker_id,
        }
    }

    pub async fn run(&mut self, rows: &[HousingRow], cancel: &CancellationToken) -> AppResult<WorkerOutcome> {
        let mut tally = Tally::new();

        for (done, row) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(WorkerOutcome::cancelled(self.worker_id, tally));
            }

            tally.incr("num_found");
            if let Err(e) = self.process(row, &mut tally).await {
                LogContext::error_with_context(
                    &e,
                    &format!("[crossref#{}] line {}", self.worker_id, row.line),
                );
                tally.incr("errors");
                if let Err(e) = self.store.reset() {
                    log_error!("[crossref#{}] connection reset failed: {}", self.worker_id, e);
                }
            }

            if (done + 1) % PROGRESS_EVERY_ROWS == 0 {
                LogContext::worker_progress("crossref", self.worker_id, done + 1, rows.len(), "records");
            }
        }

        tally.add("similarity_queries", self.resolver.similarity_queries());
        Ok(WorkerOutcome::finished(self.worker_id, tally))
    }

    async fn process(&mut self, row: &HousingRow, tally: &mut Tally) -> AppResult<()> {
        let record = match HousingRecord::from_csv(&row.record) {
            Ok(record) => record,
            Err(e) => {
                log_warn!("[crossref#{}] line {} skipped: {}", self.worker_id, row.line, e);
                tally.incr("parse_errors");
                return Ok(());
            }
        };

        if !record.has_enough_dwellings() {
            tally.incr("less_than_3_dwellings");
            return Ok(());
        }

        let Some(muni) = self.resolver.resolve_municipality(&record.muni).await? else {
            log_warn!("[crossref#{}] unknown municipality '{}'", self.worker_id, record.muni);
            tally.incr("unknown_muni");
            return Ok(());
        };

        let street_name = match self.resolver.resolve_street(&muni, &record.street_name).await? {
            Some(street) => street,
            None => {
                tally.incr("unknown_street");
                record.street_name.clone()
            }
        };

        let query = GeocodeQuery {
            street_num: record.street_num.clone(),
            street_name,
            muni: muni.clone(),
            postal_code: record.postal_code.clone(),
        };
        let Some(location) = self.geocode(&query, tally).await else {
            tally.incr("not_geocoded");
            return Ok(());
        };

        let streetview_available = match self.imagery.is_available(location.lat, location.lng).await {
            Ok(available) => available,
            Err(e) => {
                log_warn!("[crossref#{}] imagery probe for {} failed: {}", self.worker_id, record.id, e);
                false
            }
        };

        let unit = match_unit(&self.store, &location).await?;
        match &unit {
            Some(found) => tally.incr(found.method.counter()),
            None => tally.incr("unmatched"),
        }

        let building = HousingBuilding::new(&record, &muni, &location, unit.as_ref(), streetview_available);
        self.store.persist(building).await?;
        tally.incr("persisted");
        Ok(())
    }

    /// Primary provider first; the fallback runs on no result, low
    /// confidence or a provider error.
    async fn geocode(&self, query: &GeocodeQuery, tally: &mut Tally) -> Option<GeocodeResult> {
        for geocoder in [&self.primary, &self.fallback] {
            tally.incr(&format!("{}_api_calls", geocoder.name()));
            match geocoder.geocode(query).await {
                Ok(Some(result)) => return Some(result),
                Ok(None) => {}
                Err(e) => {
                    log_warn!(
                        "[crossref#{}] {} failed for '{}': {}",
                        self.worker_id,
                        geocoder.name(),
                        query.one_line(),
                        e
                    );
                    tally.incr(&format!("{}_errors", geocoder.name()));
                }
            }
        }
        None
    }
}

/// Stage entry point.
pub async fn crossref_housing(
    db: &Database,
    config: &PipelineConfig,
    csv_path: &Path,
    num_workers: usize,
    test: bool,
    cancel: CancellationToken,
) -> AppResult<StageReport> {
    let mapbox_token = config.require_mapbox_token()?.to_string();
    let google_key = config.require_google_key()?.to_string();
    let signing_secret = config.google_signing_secret.clone();

    let limit = test.then(|| TEST_ROWS_PER_WORKER * num_workers.max(1));
    let rows = load_rows(csv_path, limit)?;
    log_info!(
        "Cross-referencing {} housing records with {} workers",
        rows.len(),
        num_workers
    );

    let splits = split_flat(rows, num_workers);
    let database_url = db.url().to_string();

    let report = WorkerPool::new("crossref", cancel)
        .run_async(splits, move |split, cancel| {
            let database_url = database_url.clone();
            let mapbox_token = mapbox_token.clone();
            let google_key = google_key.clone();
            let signing_secret = signing_secret.clone();
            async move {
                let db = Database::for_worker(&database_url)?;
                let primary = Arc::new(MapboxGeocoder::new(&mapbox_token)?);
                let fallback = Arc::new(GoogleGeocoder::new(&google_key)?);
                let imagery = Arc::new(StreetViewClient::new(&google_key, signing_secret.as_deref())?);
                CrossrefWorker::new(
                    CrossrefRepositoryImpl::new(db.clone()),
                    CrossrefRepositoryImpl::new(db),
                    primary,
                    fallback,
                    imagery,
                    split.id,
                )
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
    use crate::modules::crossref::domain::geocoder::MockGeocoder;
    use crate::modules::crossref::domain::housing_record::fixtures::{row, HEADER};
    use crate::modules::crossref::domain::repository::{MockMatchStore, MockRegistryLookup};
    use crate::modules::crossref::infrastructure::housing_csv::load_rows_from;
    use crate::modules::imagery::domain::probe::MockImageryProbe;
    use crate::shared::errors::AppError;

    fn rows(dwellings: &[i32]) -> Vec<HousingRow> {
        let mut data = format!("{}\n", HEADER);
        for (i, d) in dwellings.iter().enumerate() {
            data.push_str(&row(i as i32 + 1, *d));
            data.push('\n');
        }
        load_rows_from(data.as_bytes(), None).unwrap()
    }

    fn location() -> GeocodeResult {
        GeocodeResult {
            lat: 45.5152,
            lng: -73.5589,
            address: "1234 Rue Sainte-Catherine Est".into(),
            street_name: "Rue Sainte-Catherine Est".into(),
            street_num: "1234".into(),
        }
    }

    fn lookup() -> MockRegistryLookup {
        let mut lookup = MockRegistryLookup::new();
        lookup
            .expect_known_municipalities()
            .returning(|| Ok(vec!["Montréal".into()]));
        lookup
            .expect_street_with_prefix()
            .returning(|_, _| Ok(Some("Rue Sainte-Catherine E".into())));
        lookup
    }

    fn geocoder(name: &'static str, result: Option<GeocodeResult>) -> Arc<MockGeocoder> {
        let mut geocoder = MockGeocoder::new();
        geocoder.expect_name().return_const(name);
        geocoder
            .expect_geocode()
            .returning(move |_| Ok(result.clone()));
        Arc::new(geocoder)
    }

    fn imagery(available: bool) -> Arc<MockImageryProbe> {
        let mut probe = MockImageryProbe::new();
        probe.expect_is_available().returning(move |_, _| Ok(available));
        Arc::new(probe)
    }

    #[tokio::test]
    async fn point_inside_lot_links_without_proximity_search() {
        let mut store = MockMatchStore::new();
        store
            .expect_containing_unit()
            .times(1)
            .returning(|_, _| Ok(Some("lot-a-unit".into())));
        store.expect_nearby_units().never();
        store.expect_unit_by_address().never();
        store
            .expect_persist()
            .withf(|b| b.eval_unit_id.as_deref() == Some("lot-a-unit") && b.streetview_available)
            .times(1)
            .returning(|_| Ok(()));

        let mut worker = CrossrefWorker::new(
            lookup(),
            store,
            geocoder("mapbox", Some(location())),
            geocoder("google", None),
            imagery(true),
            1,
        );
        let outcome = worker.run(&rows(&[10]), &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.tally.get("matched_by_containment"), 1);
        assert_eq!(outcome.tally.get("mapbox_api_calls"), 1);
        assert_eq!(outcome.tally.get("google_api_calls"), 0);
        assert_eq!(outcome.tally.get("persisted"), 1);
    }

    #[tokio::test]
    async fn small_buildings_are_filtered_before_any_lookup() {
        let mut lookup = MockRegistryLookup::new();
        lookup.expect_known_municipalities().never();
        let mut store = MockMatchStore::new();
        store.expect_persist().never();

        let mut worker = CrossrefWorker::new(
            lookup,
            store,
            geocoder("mapbox", None),
            geocoder("google", None),
            imagery(false),
            1,
        );
        let outcome = worker.run(&rows(&[1, 2]), &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.tally.get("num_found"), 2);
        assert_eq!(outcome.tally.get("less_than_3_dwellings"), 2);
    }

    #[tokio::test]
    async fn fallback_geocoder_and_unmatched_record_is_still_persisted() {
        let mut store = MockMatchStore::new();
        store.expect_containing_unit().returning(|_, _| Ok(None));
        store.expect_nearby_units().returning(|_, _| Ok(Vec::new()));
        store.expect_unit_by_address().returning(|_| Ok(None));
        store
            .expect_persist()
            .withf(|b| b.eval_unit_id.is_none() && !b.streetview_available)
            .times(1)
            .returning(|_| Ok(()));

        let mut failing_probe = MockImageryProbe::new();
        failing_probe
            .expect_is_available()
            .returning(|_, _| Err(AppError::NetworkError("reset".into())));

        let mut worker = CrossrefWorker::new(
            lookup(),
            store,
            geocoder("mapbox", None),
            geocoder("google", Some(location())),
            Arc::new(failing_probe),
            1,
        );
        let outcome = worker.run(&rows(&[4]), &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.tally.get("mapbox_api_calls"), 1);
        assert_eq!(outcome.tally.get("google_api_calls"), 1);
        assert_eq!(outcome.tally.get("unmatched"), 1);
    }

    #[tokio::test]
    async fn unknown_municipality_is_excluded() {
        let mut lookup = MockRegistryLookup::new();
        lookup
            .expect_known_municipalities()
            .times(1)
            .returning(|| Ok(vec!["Laval".into()]));
        lookup
            .expect_similar_municipalities()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let mut store = MockMatchStore::new();
        store.expect_persist().never();

        let mut worker = CrossrefWorker::new(
            lookup,
            store,
            geocoder("mapbox", None),
            geocoder("google", None),
            imagery(false),
            1,
        );
        let outcome = worker.run(&rows(&[5, 6]), &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.tally.get("unknown_muni"), 2);
        assert_eq!(outcome.tally.get("similarity_queries"), 1);
    }

    #[tokio::test]
    async fn database_error_resets_and_continues() {
        let mut store = MockMatchStore::new();
        store.expect_containing_unit().returning(|_, _| Ok(Some("u".into())));
        let mut calls = 0;
        store.expect_persist().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(AppError::DatabaseError("current transaction is aborted".into()))
            } else {
                Ok(())
            }
        });
        store.expect_reset().times(1).returning(|| Ok(()));

        let mut worker = CrossrefWorker::new(
            lookup(),
            store,
            geocoder("mapbox", Some(location())),
            geocoder("google", None),
            imagery(true),
            1,
        );
        let outcome = worker.run(&rows(&[5, 6]), &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.tally.get("errors"), 1);
        assert_eq!(outcome.tally.get("persisted"), 1);
    }

    #[tokio::test]
    async fn cancelled_worker_returns_partial_counts() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut worker = CrossrefWorker::new(
            MockRegistryLookup::new(),
            MockMatchStore::new(),
            geocoder("mapbox", None),
            geocoder("google", None),
            imagery(false),
            3,
        );
        let outcome = worker.run(&rows(&[5]), &cancel).await.unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.tally.get("num_found"), 0);
    }
}
