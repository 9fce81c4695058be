/// Public-housing cross-referencer
///
/// - Domain: CSV records, street normalization, name resolver, geocoder
///   seam, spatial match cascade
/// - Infrastructure: Mapbox and Google geocoders, CSV loader, registry
///   repository
/// - Application: per-worker pipeline and the stage entry point
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{crossref_housing, CrossrefWorker};
pub use domain::{Geocoder, HousingRecord, NameResolver};
