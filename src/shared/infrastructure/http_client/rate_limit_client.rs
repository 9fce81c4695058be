//! HTTP client with client-side rate limiting and retry logic
//!
//! Shared by the geocoders and the imagery probe so each service gets its
//! own quota and retry policy without duplicating request plumbing.

use super::retry_policy::{is_retryable_error, RateLimitInfo, RetryPolicy};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::LogContext;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tokio::time::sleep;

const USER_AGENT: &str = concat!("rollmap/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RateLimitClient {
    client: Client,
    rate_limiter: DefaultDirectRateLimiter,
    retry_policy: RetryPolicy,
    service_name: String,
}

impl RateLimitClient {
    /// Mapbox forward geocoding: 1000 req/min per token.
    pub fn for_mapbox() -> AppResult<Self> {
        Self::new("Mapbox", RetryPolicy::geocoder(), Self::create_rate_limiter(10.0, 10)?)
    }

    /// Google geocoding: 50 QPS per project, shared by every worker.
    pub fn for_google_geocoding() -> AppResult<Self> {
        Self::new("GoogleGeocoding", RetryPolicy::geocoder(), Self::create_rate_limiter(10.0, 5)?)
    }

    /// Street View metadata. Failures surface immediately; the caller owns
    /// the backoff.
    pub fn for_streetview() -> AppResult<Self> {
        Self::new("StreetView", RetryPolicy::no_retry(), Self::create_rate_limiter(25.0, 25)?)
    }

    /// Rate limiter with the given sustained rate and burst capacity
    fn create_rate_limiter(requests_per_second: f64, burst_size: u32) -> AppResult<DefaultDirectRateLimiter> {
        if requests_per_second <= 0.0 {
            return Err(AppError::InvalidInput(format!(
                "request rate must be positive, got {}",
                requests_per_second
            )));
        }
        let period = Duration::from_secs_f64(1.0 / requests_per_second);
        let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period)
            .ok_or_else(|| AppError::InvalidInput("request period must be non-zero".into()))?
            .allow_burst(burst);

        Ok(RateLimiter::direct(quota))
    }

    pub fn new(
        service_name: &str,
        retry_policy: RetryPolicy,
        rate_limiter: DefaultDirectRateLimiter,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rate_limiter,
            retry_policy,
            service_name: service_name.to_string(),
        })
    }

    /// GET with query parameters, retried per policy; non-success
    /// statuses are errors.
    pub async fn get_json<T>(&self, url: &str, query: &[(&str, &str)]) -> AppResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.retry_policy.max_retries {
            let started = Instant::now();
            match self.send(url, query).await {
                Ok(response) => {
                    let status = response.status();
                    LogContext::api_call(
                        &self.service_name,
                        url,
                        status.as_str(),
                        Some(started.elapsed().as_millis() as u64),
                    );

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        if attempt < self.retry_policy.max_retries {
                            let info = RateLimitInfo::from_headers(response.headers());
                            let delay = self
                                .retry_policy
                                .calculate_delay(attempt, info.recommended_delay());
                            tracing::warn!(
                                service = %self.service_name,
                                attempt = attempt + 1,
                                ?delay,
                                "rate limited, waiting before retry"
                            );
                            sleep(delay).await;
                            continue;
                        }
                        return Err(AppError::RateLimitError(format!(
                            "{} rate limit exceeded after {} attempts",
                            self.service_name,
                            attempt + 1
                        )));
                    }

                    if status.is_server_error() {
                        let message = format!("{} returned {}", self.service_name, status);
                        if attempt < self.retry_policy.max_retries {
                            let delay = self.retry_policy.calculate_delay(attempt, None);
                            tracing::warn!(service = %self.service_name, %status, ?delay, "server error, retrying");
                            last_error = Some(AppError::ExternalServiceError(message));
                            sleep(delay).await;
                            continue;
                        }
                        return Err(AppError::ExternalServiceError(message));
                    }

                    if !status.is_success() {
                        return Err(AppError::ApiError(format!(
                            "{} returned {}",
                            self.service_name, status
                        )));
                    }

                    return self.parse_response(response).await;
                }
                Err(e) => {
                    if is_retryable_error(&e) && attempt < self.retry_policy.max_retries {
                        let delay = self.retry_policy.calculate_delay(attempt, None);
                        tracing::warn!(service = %self.service_name, error = %e, ?delay, "request failed, retrying");
                        last_error = Some(AppError::from(e));
                        sleep(delay).await;
                        continue;
                    }
                    return Err(AppError::from(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::ExternalServiceError(format!("{} request failed", self.service_name))
        }))
    }

    /// Single GET returning the status and, on success, the parsed body.
    /// Transport failures come back as `NetworkError`.
    pub async fn get_with_status<T>(&self, url: &str) -> AppResult<(StatusCode, Option<T>)>
    where
        T: serde::de::DeserializeOwned,
    {
        let started = Instant::now();
        let response = self.send(url, &[]).await.map_err(AppError::from)?;
        let status = response.status();
        LogContext::api_call(
            &self.service_name,
            "metadata",
            status.as_str(),
            Some(started.elapsed().as_millis() as u64),
        );

        if !status.is_success() {
            return Ok((status, None));
        }
        let body = self.parse_response(response).await?;
        Ok((status, Some(body)))
    }

    async fn send(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, reqwest::Error> {
        self.rate_limiter.until_ready().await;

        let mut request = self.client.get(url).header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        request.send().await
    }

    async fn parse_response<T>(&self, response: Response) -> AppResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let text = response.text().await.map_err(|e| {
            AppError::SerializationError(format!(
                "Failed to read {} response: {}",
                self.service_name, e
            ))
        })?;

        serde_json::from_str(&text).map_err(|e| {
            let excerpt: String = text.chars().take(200).collect();
            AppError::SerializationError(format!(
                "Failed to parse {} response: {}. Response: {}",
                self.service_name, e, excerpt
            ))
        })
    }

    /// Whether a request could go out right now
    pub fn can_make_request_now(&self) -> bool {
        self.rate_limiter.check().is_ok()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_are_named_per_service() {
        assert_eq!(RateLimitClient::for_mapbox().unwrap().service_name(), "Mapbox");
        assert_eq!(
            RateLimitClient::for_streetview().unwrap().service_name(),
            "StreetView"
        );
    }

    #[test]
    fn fresh_client_can_send() {
        let client = RateLimitClient::for_google_geocoding().unwrap();
        assert!(client.can_make_request_now());
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(RateLimitClient::create_rate_limiter(0.0, 1).is_err());
    }
}
