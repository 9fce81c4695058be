/// Shared infrastructure concerns
///
/// Infrastructure implementations used by every pipeline stage.
pub mod database;
pub mod http_client;

// Re-exports for convenience
pub use database::{Database, DbConnection, DbPool};
pub use http_client::{RateLimitClient, RetryPolicy};
