use crate::schema::lots;
use diesel::prelude::*;
use serde::Deserialize;

/// Provincial identifier of lots that span several units.
pub const MULTIPLE_UNITS: &str = "Multiple";

/// One row of the point dataset. Source and registry share EPSG:4326
/// precision, so coordinates are stored as read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnitPoint {
    pub id: String,
    pub lng: f64,
    pub lat: f64,
}

/// Cadastral lot, without its geometry.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = lots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Lot {
    pub gid: i32,
    pub id_provinc: Option<String>,
    pub cubf: Option<i32>,
    pub code_mun: Option<String>,
}

/// How a lot maps onto registry units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotTarget<'a> {
    /// Identifier names exactly one unit.
    Unit(&'a str),
    /// Spatial join needed.
    Multiple,
    /// No identifier at all.
    Unknown,
}

impl Lot {
    pub fn target(&self) -> LotTarget<'_> {
        match self.id_provinc.as_deref().map(str::trim) {
            Some(MULTIPLE_UNITS) => LotTarget::Multiple,
            Some(id) if !id.is_empty() => LotTarget::Unit(id),
            _ => LotTarget::Unknown,
        }
    }
}
