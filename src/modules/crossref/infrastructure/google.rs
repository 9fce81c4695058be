use crate::modules::crossref::domain::entities::{GeocodeQuery, GeocodeResult};
use crate::modules::crossref::domain::geocoder::Geocoder;
use crate::shared::errors::AppResult;
use crate::shared::infrastructure::RateLimitClient;
use async_trait::async_trait;
use serde::Deserialize;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
/// Location types precise enough to trust without further checks.
const PRECISE_LOCATION_TYPES: &[&str] = &["ROOFTOP", "RANGE_INTERPOLATED"];

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeEntry>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    geometry: EntryGeometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    #[serde(default)]
    partial_match: bool,
}

#[derive(Debug, Deserialize)]
struct EntryGeometry {
    location: LatLng,
    location_type: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl GeocodeEntry {
    fn component(&self, kind: &str) -> Option<&str> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.as_str())
    }
}

/// Free-text geocoding fallback (Google Geocoding API).
pub struct GoogleGeocoder {
    http: RateLimitClient,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: &str) -> AppResult<Self> {
        Ok(Self {
            http: RateLimitClient::for_google_geocoding()?,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, query: &GeocodeQuery) -> AppResult<Option<GeocodeResult>> {
        let address = query.one_line();
        let response: GeocodeResponse = self
            .http
            .get_json(
                GEOCODE_URL,
                &[("address", address.as_str()), ("key", self.api_key.as_str())],
            )
            .await?;

        Ok(accept_entry(response, query))
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

/// Precise locations are kept as is; anything coarser needs a street
/// number and must not be a partial match.
fn accept_entry(response: GeocodeResponse, query: &GeocodeQuery) -> Option<GeocodeResult> {
    if response.status != "OK" {
        tracing::debug!(status = %response.status, "google geocode without result");
        return None;
    }
    let entry = response.results.into_iter().next()?;

    let precise = PRECISE_LOCATION_TYPES.contains(&entry.geometry.location_type.as_str());
    if !precise && (entry.partial_match || entry.component("street_number").is_none()) {
        tracing::debug!(location_type = %entry.geometry.location_type, "google match rejected");
        return None;
    }

    let street_num = entry
        .component("street_number")
        .map(str::to_string)
        .unwrap_or_else(|| query.street_num.clone());
    let street_name = entry
        .component("route")
        .map(str::to_string)
        .unwrap_or_else(|| query.street_name.clone());

    Some(GeocodeResult {
        lat: entry.geometry.location.lat,
        lng: entry.geometry.location.lng,
        address: format!("{} {}", street_num, street_name),
        street_name,
        street_num,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> GeocodeQuery {
        GeocodeQuery {
            street_num: "55".into(),
            street_name: "Rue Roy".into(),
            muni: "Montréal".into(),
            postal_code: Some("H2W 1L1".into()),
        }
    }

    fn response(location_type: &str, partial: bool, with_number: bool) -> GeocodeResponse {
        let mut components = vec![json!({
            "long_name": "Rue Roy Est", "short_name": "Rue Roy E", "types": ["route"]
        })];
        if with_number {
            components.push(json!({
                "long_name": "55", "short_name": "55", "types": ["street_number"]
            }));
        }
        serde_json::from_value(json!({
            "status": "OK",
            "results": [{
                "geometry": {
                    "location": { "lat": 45.5188, "lng": -73.5722 },
                    "location_type": location_type
                },
                "address_components": components,
                "partial_match": partial
            }]
        }))
        .unwrap()
    }

    #[test]
    fn rooftop_is_accepted() {
        let result = accept_entry(response("ROOFTOP", true, true), &query()).unwrap();
        assert_eq!(result.address, "55 Rue Roy Est");
        assert_eq!(result.lat, 45.5188);
    }

    #[test]
    fn approximate_partial_match_is_rejected() {
        assert!(accept_entry(response("APPROXIMATE", true, true), &query()).is_none());
    }

    #[test]
    fn approximate_needs_street_number() {
        assert!(accept_entry(response("GEOMETRIC_CENTER", false, false), &query()).is_none());
        assert!(accept_entry(response("GEOMETRIC_CENTER", false, true), &query()).is_some());
    }

    #[test]
    fn zero_results_is_no_result() {
        let empty: GeocodeResponse =
            serde_json::from_value(json!({ "status": "ZERO_RESULTS", "results": [] })).unwrap();
        assert!(accept_entry(empty, &query()).is_none());
    }
}
