pub mod cascade;
pub mod entities;
pub mod geocoder;
pub mod housing_record;
pub mod repository;
pub mod resolver;
pub mod similarity;
pub mod street_normalizer;

pub use cascade::{match_unit, pick_candidate};
pub use entities::{GeocodeQuery, GeocodeResult, HousingBuilding, MatchMethod, UnitCandidate, UnitMatch};
pub use geocoder::Geocoder;
pub use housing_record::{HousingRecord, MIN_DWELLINGS};
pub use repository::{MatchStore, RegistryLookup};
pub use resolver::NameResolver;
pub use street_normalizer::StreetNormalizer;
