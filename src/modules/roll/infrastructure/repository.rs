use crate::modules::roll::domain::eval_unit::EvalUnit;
use crate::modules::roll::domain::repository::EvalUnitStore;
use crate::schema::evalunits;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::shared::utils::logger::LogContext;
use diesel::prelude::*;

pub struct EvalUnitRepositoryImpl {
    db: Database,
}

impl EvalUnitRepositoryImpl {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn count(&self) -> AppResult<i64> {
        let mut conn = self.db.get_connection()?;
        evalunits::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to count units: {}", e)))
    }

    /// Remove units carrying neither an inferior nor a superior street
    /// number: streets and structures with no civic address.
    pub fn delete_without_street_number(&self) -> AppResult<usize> {
        let mut conn = self.db.get_connection()?;
        LogContext::db_operation("delete_without_street_number", "evalunits", None);

        diesel::delete(
            evalunits::table
                .filter(evalunits::num_adr_inf.is_null())
                .filter(evalunits::num_adr_sup.is_null()),
        )
        .execute(&mut conn)
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to delete units without street number: {}", e))
        })
    }

    pub fn find_by_id(&self, id: &str) -> AppResult<Option<EvalUnit>> {
        let mut conn = self.db.get_connection()?;
        evalunits::table
            .find(id)
            .select(EvalUnit::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to load unit {}: {}", id, e)))
    }
}

impl EvalUnitStore for EvalUnitRepositoryImpl {
    fn exists(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.db.get_connection()?;
        diesel::select(diesel::dsl::exists(
            evalunits::table.filter(evalunits::id.eq(id)),
        ))
        .get_result(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to check unit {}: {}", id, e)))
    }

    fn insert_batch(&self, units: &[EvalUnit]) -> AppResult<usize> {
        if units.is_empty() {
            return Ok(0);
        }
        let mut conn = self.db.get_connection()?;
        diesel::insert_into(evalunits::table)
            .values(units)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert units: {}", e)))
    }

    fn reset(&mut self) -> AppResult<()> {
        self.db.reset()
    }
}
