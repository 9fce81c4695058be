use crate::modules::imagery::domain::entities::{Availability, CandidateUnit, CANDIDATE_CUBFS};
use crate::modules::imagery::domain::repository::AvailabilityStore;
use crate::schema::sv_avail;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use async_trait::async_trait;
use diesel::pg::upsert::excluded;
use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Integer};
use tokio::task;

pub struct AvailabilityRepositoryImpl {
    db: Database,
}

impl AvailabilityRepositoryImpl {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AvailabilityStore for AvailabilityRepositoryImpl {
    async fn candidates(&self, limit: Option<i64>) -> AppResult<Vec<CandidateUnit>> {
        let db = self.db.clone();

        task::spawn_blocking(move || -> AppResult<Vec<CandidateUnit>> {
            let mut conn = db.get_connection()?;
            diesel::sql_query(
                "SELECT id, lat, lng FROM evalunits \
                 WHERE cubf = ANY($1) AND lat IS NOT NULL AND lng IS NOT NULL \
                 ORDER BY id LIMIT $2",
            )
            .bind::<Array<Integer>, _>(CANDIDATE_CUBFS)
            .bind::<BigInt, _>(limit.unwrap_or(i64::MAX))
            .load(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to load imagery candidates: {}", e)))
        })
        .await?
    }

    async fn upsert(&self, results: Vec<Availability>) -> AppResult<usize> {
        if results.is_empty() {
            return Ok(0);
        }
        let db = self.db.clone();

        task::spawn_blocking(move || -> AppResult<usize> {
            let mut conn = db.get_connection()?;
            diesel::insert_into(sv_avail::table)
                .values(&results)
                .on_conflict(sv_avail::id)
                .do_update()
                .set(sv_avail::avail.eq(excluded(sv_avail::avail)))
                .execute(&mut conn)
                .map_err(|e| AppError::DatabaseError(format!("Failed to store availability: {}", e)))
        })
        .await?
    }

    fn reset(&mut self) -> AppResult<()> {
        self.db.reset()
    }
}
