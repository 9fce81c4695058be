use super::entities::Lot;
use crate::shared::errors::AppResult;

/// Per-worker writes of unit coordinates.
#[cfg_attr(test, mockall::automock)]
pub trait CoordinateStore: Send {
    /// Set longitude, latitude and point geometry. Returns whether a unit
    /// with this id exists.
    fn set_coordinates(&self, id: &str, lng: f64, lat: f64) -> AppResult<bool>;

    fn reset(&mut self) -> AppResult<()>;
}

/// Lot table access for the single-threaded linker.
#[cfg_attr(test, mockall::automock)]
pub trait LotStore: Send {
    fn count_lots(&self) -> AppResult<i64>;

    /// Lots ordered by `gid` descending.
    fn lot_page(&self, limit: i64, offset: i64) -> AppResult<Vec<Lot>>;

    /// Point the unit `unit_id` at lot `gid`. Returns rows updated (0 or 1).
    fn link_unit(&self, gid: i32, unit_id: &str) -> AppResult<usize>;

    /// Point every unit whose geometry falls inside lot `gid` at it.
    fn link_contained_units(&self, gid: i32) -> AppResult<usize>;

    fn reset(&mut self) -> AppResult<()>;
}
