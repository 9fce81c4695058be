pub mod availability_service;

pub use availability_service::{check_imagery, AvailabilityChecker};
