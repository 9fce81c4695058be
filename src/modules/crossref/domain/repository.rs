use super::entities::{HousingBuilding, UnitCandidate};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Read-only name lookups against the registry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn known_municipalities(&self) -> AppResult<Vec<String>>;

    /// Registry municipalities above the trigram threshold with their score.
    async fn similar_municipalities(&self, name: &str) -> AppResult<Vec<(String, f32)>>;

    async fn street_with_prefix(&self, muni: &str, street: &str) -> AppResult<Option<String>>;

    async fn street_containing(&self, muni: &str, fragment: &str) -> AppResult<Option<String>>;

    async fn similar_streets(&self, muni: &str, street: &str) -> AppResult<Vec<(String, f32)>>;
}

/// Spatial match queries and housing persistence. Every query skips units
/// whose land-use code is excluded from matching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Unit whose lot polygon contains the point.
    async fn containing_unit(&self, lng: f64, lat: f64) -> AppResult<Option<String>>;

    /// Nearest units within the search radius, closest first.
    async fn nearby_units(&self, lng: f64, lat: f64) -> AppResult<Vec<UnitCandidate>>;

    /// Unit with this exact address, case-insensitive, not yet linked to a
    /// housing record.
    async fn unit_by_address(&self, address: &str) -> AppResult<Option<String>>;

    /// Upsert the building and, when linked, tag the unit's associated map.
    async fn persist(&self, building: HousingBuilding) -> AppResult<()>;

    fn reset(&mut self) -> AppResult<()>;
}
