pub mod crossref_service;

pub use crossref_service::{crossref_housing, CrossrefWorker, DEFAULT_WORKERS};
