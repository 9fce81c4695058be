pub mod google;
pub mod housing_csv;
pub mod mapbox;
pub mod repository;

pub use google::GoogleGeocoder;
pub use housing_csv::{load_rows, HousingRow};
pub use mapbox::MapboxGeocoder;
pub use repository::CrossrefRepositoryImpl;
