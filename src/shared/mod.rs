// Shared kernel used by every pipeline stage

pub mod config; // Environment-driven configuration
pub mod errors; // Shared error types
pub mod infrastructure; // Database pool and migrations
pub mod tally; // Stage counters
pub mod utils; // Logging

// Re-exports for convenience
pub use config::{MunicipalityTable, PipelineConfig};
pub use errors::{AppError, AppResult};
pub use infrastructure::database::Database;
pub use tally::Tally;
