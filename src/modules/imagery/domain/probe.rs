use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Metadata probe for street-level imagery around a point.
///
/// Transport failures must come back as `AppError::NetworkError`; callers
/// treat that variant as transient and everything else as permanent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageryProbe: Send + Sync {
    async fn is_available(&self, lat: f64, lng: f64) -> AppResult<bool>;
}
