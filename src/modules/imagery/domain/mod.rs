pub mod backoff;
pub mod entities;
pub mod probe;
pub mod repository;

pub use backoff::Backoff;
pub use entities::{Availability, CandidateUnit, CANDIDATE_CUBFS};
pub use probe::ImageryProbe;
pub use repository::AvailabilityStore;
