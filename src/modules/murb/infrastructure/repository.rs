use crate::modules::murb::domain::entities::{ArchiveOutcome, Cluster};
use crate::modules::murb::domain::repository::MurbStore;
use crate::modules::roll::domain::codes::MURB_CUBF;
use crate::modules::roll::domain::AGGREGATE_SUFFIX;
use crate::modules::roll::EvalUnit;
use crate::schema::evalunits;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Integer, Text};

/// Columns copied verbatim from `evalunits` into `murb_disag`.
const ARCHIVED_COLUMNS: &str = "id, lat, lng, point, lot_id, year, muni, muni_code, arrond, \
    address, num_adr_inf, num_adr_inf_2, num_adr_sup, num_adr_sup_2, street_name, apt_num, \
    apt_num_1, apt_num_2, mat18, cubf, file_num, nghbr_unit, owner_date, owner_type, \
    owner_status, lot_lin_dim, lot_area, max_floors, const_yr, const_yr_real, floor_area, \
    phys_link, const_type, num_dwelling, num_rental, num_non_res, apprais_date, lot_value, \
    building_value, total_value, prev_total_value, associated, date_added";

pub struct MurbRepositoryImpl {
    db: Database,
}

impl MurbRepositoryImpl {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn aggregate_pattern() -> String {
        format!("%{}", AGGREGATE_SUFFIX)
    }
}

impl MurbStore for MurbRepositoryImpl {
    fn clusters(&self, limit: Option<i64>) -> AppResult<Vec<Cluster>> {
        let mut conn = self.db.get_connection()?;

        let query = diesel::sql_query(
            "SELECT address, muni, lat, lng, count(*) AS members, sum(num_dwelling) AS dwellings \
             FROM evalunits \
             WHERE cubf = $1 AND lat IS NOT NULL AND lng IS NOT NULL AND id NOT LIKE $2 \
             GROUP BY lat, lng, address, muni \
             HAVING count(*) > 1 \
             ORDER BY count(*), lat, lng, address, muni \
             LIMIT $3",
        )
        .bind::<Integer, _>(MURB_CUBF)
        .bind::<Text, _>(Self::aggregate_pattern())
        .bind::<BigInt, _>(limit.unwrap_or(i64::MAX));

        query
            .load::<Cluster>(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to find duplicate clusters: {}", e)))
    }

    fn members(&self, cluster: &Cluster) -> AppResult<Vec<EvalUnit>> {
        let mut conn = self.db.get_connection()?;
        evalunits::table
            .filter(evalunits::cubf.eq(MURB_CUBF))
            .filter(evalunits::lat.eq(cluster.lat))
            .filter(evalunits::lng.eq(cluster.lng))
            .filter(evalunits::address.eq(&cluster.address))
            .filter(evalunits::muni.eq(&cluster.muni))
            .filter(evalunits::id.not_like(Self::aggregate_pattern()))
            .order(evalunits::id)
            .select(EvalUnit::as_select())
            .load(&mut conn)
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "Failed to load members of '{}' ({}): {}",
                    cluster.address, cluster.muni, e
                ))
            })
    }

    fn replace_with_aggregate(&self, aggregate: &EvalUnit, member_ids: &[String]) -> AppResult<ArchiveOutcome> {
        let mut conn = self.db.get_connection()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let inserted = diesel::insert_into(evalunits::table)
                .values(aggregate)
                .on_conflict_do_nothing()
                .execute(conn)?;

            diesel::sql_query(
                "UPDATE evalunits SET point = ST_SetSRID(ST_MakePoint(lng, lat), 4326) \
                 WHERE id = $1 AND lat IS NOT NULL AND lng IS NOT NULL",
            )
            .bind::<Text, _>(&aggregate.id)
            .execute(conn)?;

            let archived = diesel::sql_query(format!(
                "INSERT INTO murb_disag (agg_id, {cols}) \
                 SELECT $1, {cols} FROM evalunits WHERE id = ANY($2) \
                 ON CONFLICT DO NOTHING",
                cols = ARCHIVED_COLUMNS
            ))
            .bind::<Text, _>(&aggregate.id)
            .bind::<Array<Text>, _>(member_ids)
            .execute(conn)?;

            let deleted = diesel::delete(evalunits::table.filter(evalunits::id.eq_any(member_ids)))
                .execute(conn)?;

            Ok(ArchiveOutcome {
                inserted,
                archived,
                deleted,
            })
        })
    }

    fn reset(&mut self) -> AppResult<()> {
        self.db.reset()
    }
}
