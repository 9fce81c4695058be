use super::entities::{GeocodeQuery, GeocodeResult};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Address-to-point provider.
///
/// `Ok(None)` means the provider answered but the answer is missing or
/// not trustworthy enough; it is never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &GeocodeQuery) -> AppResult<Option<GeocodeResult>>;

    /// Short provider name used in counters and logs.
    fn name(&self) -> &'static str;
}
