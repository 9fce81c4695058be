use crate::modules::geo::domain::entities::Lot;
use crate::modules::geo::domain::repository::{CoordinateStore, LotStore};
use crate::schema::{evalunits, lots};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::shared::utils::logger::LogContext;
use diesel::prelude::*;
use diesel::sql_types::{Double, Integer, Text};

pub struct GeoRepositoryImpl {
    db: Database,
}

impl GeoRepositoryImpl {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Remove units that never received coordinates.
    pub fn delete_without_coordinates(&self) -> AppResult<usize> {
        let mut conn = self.db.get_connection()?;
        LogContext::db_operation("delete_without_coordinates", "evalunits", None);

        diesel::delete(evalunits::table.filter(evalunits::lat.is_null()))
            .execute(&mut conn)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to delete units without coordinates: {}", e))
            })
    }
}

impl CoordinateStore for GeoRepositoryImpl {
    fn set_coordinates(&self, id: &str, lng: f64, lat: f64) -> AppResult<bool> {
        let mut conn = self.db.get_connection()?;

        let updated = diesel::sql_query(
            "UPDATE evalunits SET lng = $1, lat = $2, point = ST_SetSRID(ST_MakePoint($1, $2), 4326) \
             WHERE id = $3",
        )
        .bind::<Double, _>(lng)
        .bind::<Double, _>(lat)
        .bind::<Text, _>(id)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to set coordinates of {}: {}", id, e)))?;

        Ok(updated > 0)
    }

    fn reset(&mut self) -> AppResult<()> {
        self.db.reset()
    }
}

impl LotStore for GeoRepositoryImpl {
    fn count_lots(&self) -> AppResult<i64> {
        let mut conn = self.db.get_connection()?;
        lots::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to count lots: {}", e)))
    }

    fn lot_page(&self, limit: i64, offset: i64) -> AppResult<Vec<Lot>> {
        let mut conn = self.db.get_connection()?;
        lots::table
            .select(Lot::as_select())
            .order(lots::gid.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to load lots: {}", e)))
    }

    fn link_unit(&self, gid: i32, unit_id: &str) -> AppResult<usize> {
        let mut conn = self.db.get_connection()?;
        diesel::update(evalunits::table.find(unit_id))
            .set(evalunits::lot_id.eq(gid))
            .execute(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to link lot {}: {}", gid, e)))
    }

    fn link_contained_units(&self, gid: i32) -> AppResult<usize> {
        let mut conn = self.db.get_connection()?;
        diesel::sql_query(
            "UPDATE evalunits e SET lot_id = l.gid FROM lots l \
             WHERE l.gid = $1 AND e.point IS NOT NULL AND ST_Intersects(l.geom, e.point)",
        )
        .bind::<Integer, _>(gid)
        .execute(&mut conn)
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed spatial link of lot {}: {}", gid, e))
        })
    }

    fn reset(&mut self) -> AppResult<()> {
        self.db.reset()
    }
}
