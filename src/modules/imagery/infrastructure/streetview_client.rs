use crate::modules::imagery::domain::probe::ImageryProbe;
use crate::modules::imagery::infrastructure::url_signer::sign_url;
use crate::shared::errors::AppResult;
use crate::shared::infrastructure::RateLimitClient;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

const METADATA_URL: &str = "https://maps.googleapis.com/maps/api/streetview/metadata";
pub const SEARCH_RADIUS_M: u32 = 100;
const ZERO_RESULTS: &str = "ZERO_RESULTS";

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    status: String,
}

/// Street View metadata probe. Metadata requests are free of charge.
pub struct StreetViewClient {
    http: RateLimitClient,
    api_key: String,
    signing_secret: Option<String>,
}

impl StreetViewClient {
    pub fn new(api_key: &str, signing_secret: Option<&str>) -> AppResult<Self> {
        Ok(Self {
            http: RateLimitClient::for_streetview()?,
            api_key: api_key.to_string(),
            signing_secret: signing_secret.map(str::to_string),
        })
    }

    pub fn metadata_url(&self, lat: f64, lng: f64) -> AppResult<String> {
        let url = format!(
            "{}?key={}&location={},{}&radius={}",
            METADATA_URL,
            urlencoding::encode(&self.api_key),
            lat,
            lng,
            SEARCH_RADIUS_M
        );
        match &self.signing_secret {
            Some(secret) => sign_url(&url, secret),
            None => Ok(url),
        }
    }
}

#[async_trait]
impl ImageryProbe for StreetViewClient {
    async fn is_available(&self, lat: f64, lng: f64) -> AppResult<bool> {
        let url = self.metadata_url(lat, lng)?;
        let (status, body) = self.http.get_with_status::<MetadataResponse>(&url).await?;
        tracing::debug!(lat, lng, %status, "imagery metadata");

        Ok(status == StatusCode::OK && body.is_some_and(|b| b.status != ZERO_RESULTS))
    }
}
