use crate::modules::crossref::domain::entities::{GeocodeQuery, GeocodeResult};
use crate::modules::crossref::domain::geocoder::Geocoder;
use crate::shared::errors::AppResult;
use crate::shared::infrastructure::RateLimitClient;
use async_trait::async_trait;
use serde::Deserialize;

const FORWARD_URL: &str = "https://api.mapbox.com/search/geocode/v6/forward";
/// Bias results towards the centre of the province.
const PROXIMITY: &str = "-72.9722258594702,46.46566109584455";
const ACCEPTED_CONFIDENCE: &[&str] = &["medium", "high", "exact"];

#[derive(Debug, Deserialize)]
struct ForwardResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    match_code: Option<MatchCode>,
    context: Option<Context>,
}

#[derive(Debug, Deserialize)]
struct MatchCode {
    confidence: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Context {
    address: Option<ContextAddress>,
}

#[derive(Debug, Deserialize)]
struct ContextAddress {
    name: Option<String>,
    street_name: Option<String>,
    address_number: Option<String>,
}

/// Structured forward geocoding (Mapbox v6).
pub struct MapboxGeocoder {
    http: RateLimitClient,
    access_token: String,
}

impl MapboxGeocoder {
    pub fn new(access_token: &str) -> AppResult<Self> {
        Ok(Self {
            http: RateLimitClient::for_mapbox()?,
            access_token: access_token.to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn geocode(&self, query: &GeocodeQuery) -> AppResult<Option<GeocodeResult>> {
        let response: ForwardResponse = self
            .http
            .get_json(
                FORWARD_URL,
                &[
                    ("access_token", self.access_token.as_str()),
                    ("limit", "1"),
                    ("proximity", PROXIMITY),
                    ("types", "address"),
                    ("autocomplete", "false"),
                    ("address_number", query.street_num.as_str()),
                    ("street", query.street_name.as_str()),
                    ("place", query.muni.as_str()),
                ],
            )
            .await?;

        Ok(accept_feature(response, query))
    }

    fn name(&self) -> &'static str {
        "mapbox"
    }
}

/// First feature, if confident enough. Mapbox's own address spelling
/// replaces the query's.
fn accept_feature(response: ForwardResponse, query: &GeocodeQuery) -> Option<GeocodeResult> {
    let feature = response.features.into_iter().next()?;

    let confidence = feature
        .properties
        .match_code
        .and_then(|m| m.confidence)
        .unwrap_or_default();
    if !ACCEPTED_CONFIDENCE.contains(&confidence.as_str()) {
        tracing::debug!(confidence = %confidence, "mapbox match rejected");
        return None;
    }

    let (lng, lat) = match feature.geometry.coordinates.as_slice() {
        [lng, lat, ..] => (*lng, *lat),
        _ => return None,
    };

    let address = feature.properties.context.and_then(|c| c.address);
    let street_num = address
        .as_ref()
        .and_then(|a| a.address_number.clone())
        .unwrap_or_else(|| query.street_num.clone());
    let street_name = address
        .as_ref()
        .and_then(|a| a.street_name.clone())
        .unwrap_or_else(|| query.street_name.clone());
    let full = address
        .and_then(|a| a.name)
        .unwrap_or_else(|| format!("{} {}", street_num, street_name));

    Some(GeocodeResult {
        lat,
        lng,
        address: full,
        street_name,
        street_num,
    })
}
