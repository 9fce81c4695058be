/// Imagery availability checker
///
/// - Domain: probe seam, backoff schedule, availability cache entities
/// - Infrastructure: signed Street View metadata client, `sv_avail` repository
/// - Application: per-worker checker and the stage entry point
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{check_imagery, AvailabilityChecker};
pub use domain::{Backoff, ImageryProbe};
pub use infrastructure::StreetViewClient;
