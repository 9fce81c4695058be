use crate::modules::crossref::domain::entities::{HousingBuilding, UnitCandidate, UnitId};
use crate::modules::crossref::domain::repository::{MatchStore, RegistryLookup};
use crate::schema::{evalunits, hlm_buildings};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Float4, Integer, Text};
use tokio::task;

/// Parks, water bodies and vacant land never take a housing record.
const MATCHABLE_UNIT: &str = "NOT (e.cubf BETWEEN 4000 AND 4999 \
    OR e.cubf BETWEEN 7600 AND 7699 \
    OR e.cubf BETWEEN 9200 AND 9399)";
/// Degrees, roughly 100 m at these latitudes.
pub const PROXIMITY_RADIUS: f64 = 0.001;
pub const PROXIMITY_CANDIDATES: i64 = 5;
const SIMILAR_NAMES: i64 = 5;

#[derive(Debug, QueryableByName)]
struct ScoredName {
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Float4)]
    score: f32,
}

#[derive(Debug, QueryableByName)]
struct Name {
    #[diesel(sql_type = Text)]
    name: String,
}

pub struct CrossrefRepositoryImpl {
    db: Database,
}

impl CrossrefRepositoryImpl {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RegistryLookup for CrossrefRepositoryImpl {
    async fn known_municipalities(&self) -> AppResult<Vec<String>> {
        let db = self.db.clone();

        task::spawn_blocking(move || -> AppResult<Vec<String>> {
            let mut conn = db.get_connection()?;
            evalunits::table
                .select(evalunits::muni)
                .distinct()
                .load::<String>(&mut conn)
                .map_err(|e| AppError::DatabaseError(format!("Failed to load municipalities: {}", e)))
        })
        .await?
    }

    async fn similar_municipalities(&self, name: &str) -> AppResult<Vec<(String, f32)>> {
        let db = self.db.clone();
        let name = name.to_string();

        task::spawn_blocking(move || -> AppResult<Vec<(String, f32)>> {
            let mut conn = db.get_connection()?;
            let rows: Vec<ScoredName> = diesel::sql_query(
                "SELECT DISTINCT muni AS name, similarity(muni, $1) AS score \
                 FROM evalunits WHERE muni % $1 \
                 ORDER BY score DESC LIMIT $2",
            )
            .bind::<Text, _>(&name)
            .bind::<BigInt, _>(SIMILAR_NAMES)
            .load(&mut conn)?;
            Ok(rows.into_iter().map(|r| (r.name, r.score)).collect())
        })
        .await?
    }

    async fn street_with_prefix(&self, muni: &str, street: &str) -> AppResult<Option<String>> {
        let db = self.db.clone();
        let (muni, street) = (muni.to_string(), street.to_string());

        task::spawn_blocking(move || -> AppResult<Option<String>> {
            let mut conn = db.get_connection()?;
            let row: Option<Name> = diesel::sql_query(
                "SELECT street_name AS name FROM evalunits \
                 WHERE muni = $1 AND lower(street_name) LIKE lower($2) || '%' \
                 LIMIT 1",
            )
            .bind::<Text, _>(&muni)
            .bind::<Text, _>(&street)
            .get_result(&mut conn)
            .optional()?;
            Ok(row.map(|r| r.name))
        })
        .await?
    }

    async fn street_containing(&self, muni: &str, fragment: &str) -> AppResult<Option<String>> {
        let db = self.db.clone();
        let (muni, fragment) = (muni.to_string(), fragment.to_string());

        task::spawn_blocking(move || -> AppResult<Option<String>> {
            let mut conn = db.get_connection()?;
            let row: Option<Name> = diesel::sql_query(
                "SELECT street_name AS name FROM evalunits \
                 WHERE muni = $1 AND lower(street_name) LIKE '%' || $2 || '%' \
                 LIMIT 1",
            )
            .bind::<Text, _>(&muni)
            .bind::<Text, _>(&fragment)
            .get_result(&mut conn)
            .optional()?;
            Ok(row.map(|r| r.name))
        })
        .await?
    }

    async fn similar_streets(&self, muni: &str, street: &str) -> AppResult<Vec<(String, f32)>> {
        let db = self.db.clone();
        let (muni, street) = (muni.to_string(), street.to_string());

        task::spawn_blocking(move || -> AppResult<Vec<(String, f32)>> {
            let mut conn = db.get_connection()?;
            let rows: Vec<ScoredName> = diesel::sql_query(
                "SELECT DISTINCT street_name AS name, similarity(street_name, $2) AS score \
                 FROM evalunits WHERE muni = $1 AND street_name % $2 \
                 ORDER BY score DESC LIMIT $3",
            )
            .bind::<Text, _>(&muni)
            .bind::<Text, _>(&street)
            .bind::<BigInt, _>(SIMILAR_NAMES)
            .load(&mut conn)?;
            Ok(rows.into_iter().map(|r| (r.name, r.score)).collect())
        })
        .await?
    }
}

#[async_trait]
impl MatchStore for CrossrefRepositoryImpl {
    async fn containing_unit(&self, lng: f64, lat: f64) -> AppResult<Option<String>> {
        let db = self.db.clone();

        task::spawn_blocking(move || -> AppResult<Option<String>> {
            let mut conn = db.get_connection()?;
            let row: Option<UnitId> = diesel::sql_query(format!(
                "SELECT e.id FROM evalunits e JOIN lots l ON l.gid = e.lot_id \
                 WHERE ST_Intersects(l.geom, ST_SetSRID(ST_MakePoint($1, $2), 4326)) \
                 AND {} ORDER BY e.id LIMIT 1",
                MATCHABLE_UNIT
            ))
            .bind::<Double, _>(lng)
            .bind::<Double, _>(lat)
            .get_result(&mut conn)
            .optional()?;
            Ok(row.map(|r| r.id))
        })
        .await?
    }

    async fn nearby_units(&self, lng: f64, lat: f64) -> AppResult<Vec<UnitCandidate>> {
        let db = self.db.clone();

        task::spawn_blocking(move || -> AppResult<Vec<UnitCandidate>> {
            let mut conn = db.get_connection()?;
            diesel::sql_query(format!(
                "SELECT e.id, e.num_adr_inf, e.num_adr_sup \
                 FROM evalunits e LEFT JOIN lots l ON l.gid = e.lot_id \
                 WHERE ST_DWithin(COALESCE(l.geom, e.point), ST_SetSRID(ST_MakePoint($1, $2), 4326), $3) \
                 AND {} \
                 ORDER BY ST_Distance(COALESCE(l.geom, e.point), ST_SetSRID(ST_MakePoint($1, $2), 4326)) \
                 LIMIT $4",
                MATCHABLE_UNIT
            ))
            .bind::<Double, _>(lng)
            .bind::<Double, _>(lat)
            .bind::<Double, _>(PROXIMITY_RADIUS)
            .bind::<BigInt, _>(PROXIMITY_CANDIDATES)
            .load(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Proximity search failed: {}", e)))
        })
        .await?
    }

    async fn unit_by_address(&self, address: &str) -> AppResult<Option<String>> {
        let db = self.db.clone();
        let address = address.to_string();

        task::spawn_blocking(move || -> AppResult<Option<String>> {
            let mut conn = db.get_connection()?;
            let row: Option<UnitId> = diesel::sql_query(format!(
                "SELECT e.id FROM evalunits e \
                 WHERE lower(e.address) = lower($1) AND {} \
                 AND NOT EXISTS (SELECT 1 FROM hlm_buildings h WHERE h.eval_unit_id = e.id) \
                 ORDER BY e.id LIMIT 1",
                MATCHABLE_UNIT
            ))
            .bind::<Text, _>(&address)
            .get_result(&mut conn)
            .optional()?;
            Ok(row.map(|r| r.id))
        })
        .await?
    }

    async fn persist(&self, building: HousingBuilding) -> AppResult<()> {
        let db = self.db.clone();

        task::spawn_blocking(move || -> AppResult<()> {
            let mut conn = db.get_connection()?;
            conn.transaction::<_, AppError, _>(|conn| {
                diesel::insert_into(hlm_buildings::table)
                    .values(&building)
                    .on_conflict(hlm_buildings::id)
                    .do_update()
                    .set(&building)
                    .execute(conn)?;

                diesel::sql_query(
                    "UPDATE hlm_buildings SET point = ST_SetSRID(ST_MakePoint($2, $3), 4326) WHERE id = $1",
                )
                .bind::<Integer, _>(building.id)
                .bind::<Double, _>(building.lng)
                .bind::<Double, _>(building.lat)
                .execute(conn)?;

                if let Some(unit_id) = &building.eval_unit_id {
                    diesel::sql_query(
                        "UPDATE evalunits \
                         SET associated = COALESCE(associated, '{}'::jsonb) || jsonb_build_object('hlm', $2) \
                         WHERE id = $1",
                    )
                    .bind::<Text, _>(unit_id)
                    .bind::<Integer, _>(building.id)
                    .execute(conn)?;
                }
                Ok(())
            })
        })
        .await?
    }

    fn reset(&mut self) -> AppResult<()> {
        self.db.reset()
    }
}
