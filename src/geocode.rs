//! Address resolution
//!
//! Turns a free-form address into a city and state using the session's
//! geocoder, and records the full address and coordinates on the session.

use crate::config::GeocoderConfig;
use crate::error::{LookupError, Result};
use crate::session::SessionContext;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A single geocoding match
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedLocation {
    /// Formatted address as returned by the service
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Address components (city, state, postcode, ...)
    pub components: HashMap<String, String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the service has no match for the address.
    async fn geocode(&self, address: &str, address_details: bool) -> Result<Option<GeocodedLocation>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlace {
    pub city: String,
    pub state: String,
}

/// Component keys tried, in order, for the locality.
const LOCALITY_KEYS: [&str; 3] = ["city", "town", "village"];

pub async fn resolve(session: &mut SessionContext, address: &str) -> Result<ResolvedPlace> {
    let geocoder = session.geocoder()?;
    let location = geocoder
        .geocode(address, true)
        .await?
        .ok_or_else(|| LookupError::Resolution(format!("address not found: {}", address)))?;

    session.record_location(location.address.clone(), (location.latitude, location.longitude));

    let city = LOCALITY_KEYS
        .iter()
        .find_map(|key| location.components.get(*key))
        .cloned()
        .ok_or_else(|| LookupError::Resolution(format!("no city for address: {}", location.address)))?;
    let state = location
        .components
        .get("state")
        .cloned()
        .ok_or_else(|| LookupError::Resolution(format!("no state for address: {}", location.address)))?;

    info!("Resolved '{}' to {}, {}", address, city, state);
    Ok(ResolvedPlace { city, state })
}

/// Nominatim (OpenStreetMap) geocoding client
pub struct NominatimGeocoder {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    address: HashMap<String, String>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        // Nominatim's usage policy requires an identifying User-Agent.
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LookupError::Remote(format!("Failed to create HTTP client for geocoder: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str, address_details: bool) -> Result<Option<GeocodedLocation>> {
        let url = format!("{}/search", self.base_url);
        debug!("Geocoding '{}' via {}", address, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", address),
                ("format", "jsonv2"),
                ("addressdetails", if address_details { "1" } else { "0" }),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| LookupError::Remote(format!("Geocoder request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Geocoder returned status {}", status);
            return Err(LookupError::Remote(format!(
                "Geocoder failed with status {}: {}",
                status, text
            )));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| LookupError::Remote(format!("Failed to parse geocoder response: {}", e)))?;

        places.into_iter().next().map(to_location).transpose()
    }
}

fn to_location(place: NominatimPlace) -> Result<GeocodedLocation> {
    let parse = |value: &str, field: &str| {
        value
            .parse::<f64>()
            .map_err(|_| LookupError::Remote(format!("Geocoder returned invalid {}: {}", field, value)))
    };

    Ok(GeocodedLocation {
        latitude: parse(place.lat.as_str(), "latitude")?,
        longitude: parse(place.lon.as_str(), "longitude")?,
        address: place.display_name,
        components: place.address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CompanyTable, FilterCriteria, RowStream};
    use crate::session::SessionConnector;
    use std::sync::Arc;

    struct FixedGeocoder(Option<GeocodedLocation>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, _address: &str, details: bool) -> Result<Option<GeocodedLocation>> {
            assert!(details, "resolver must request address details");
            Ok(self.0.clone())
        }
    }

    struct NoRows;

    #[async_trait]
    impl CompanyTable for NoRows {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn filter(&self, _criteria: &FilterCriteria) -> Result<RowStream> {
            Ok(RowStream::from_rows(Vec::new()))
        }
    }

    struct Fixed(Option<GeocodedLocation>);

    impl SessionConnector for Fixed {
        fn connect_table(&self) -> Result<Arc<dyn CompanyTable>> {
            Ok(Arc::new(NoRows))
        }

        fn connect_geocoder(&self) -> Result<Arc<dyn Geocoder>> {
            Ok(Arc::new(FixedGeocoder(self.0.clone())))
        }
    }

    fn seattle(components: &[(&str, &str)]) -> GeocodedLocation {
        GeocodedLocation {
            address: "Seattle, King County, Washington, United States".to_string(),
            latitude: 47.6038,
            longitude: -122.3301,
            components: components
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn session_with(location: Option<GeocodedLocation>) -> SessionContext {
        let mut session = SessionContext::new();
        session.ensure_initialized(&Fixed(location)).unwrap();
        session
    }

    #[tokio::test]
    async fn test_resolve_returns_city_state_and_records_location() {
        let mut session = session_with(Some(seattle(&[("city", "Seattle"), ("state", "Washington")])));

        let place = resolve(&mut session, "Seattle, WA").await.unwrap();
        assert_eq!(
            place,
            ResolvedPlace {
                city: "Seattle".to_string(),
                state: "Washington".to_string(),
            }
        );
        assert_eq!(session.address(), Some("Seattle, King County, Washington, United States"));
        assert_eq!(session.coordinates(), Some((47.6038, -122.3301)));
    }

    #[tokio::test]
    async fn test_no_match_is_resolution_error() {
        let mut session = session_with(None);

        let err = resolve(&mut session, "zzzz nowhere").await.unwrap_err();
        assert!(matches!(err, LookupError::Resolution(_)));
        assert!(session.address().is_none());
    }

    #[tokio::test]
    async fn test_town_used_when_city_missing() {
        let mut session = session_with(Some(seattle(&[("town", "Leavenworth"), ("state", "Washington")])));

        let place = resolve(&mut session, "Leavenworth, WA").await.unwrap();
        assert_eq!(place.city, "Leavenworth");
    }

    #[tokio::test]
    async fn test_missing_state_still_records_location() {
        let mut session = session_with(Some(seattle(&[("city", "Seattle")])));

        let err = resolve(&mut session, "Seattle").await.unwrap_err();
        assert!(matches!(err, LookupError::Resolution(_)));
        assert_eq!(session.coordinates(), Some((47.6038, -122.3301)));
    }

    #[test]
    fn test_nominatim_place_parsing() {
        let json = r#"[{
            "place_id": 123,
            "lat": "47.6038321",
            "lon": "-122.330062",
            "display_name": "Seattle, King County, Washington, United States",
            "address": {"city": "Seattle", "county": "King County", "state": "Washington", "ISO3166-2-lvl4": "US-WA", "country_code": "us"}
        }]"#;
        let places: Vec<NominatimPlace> = serde_json::from_str(json).unwrap();
        let location = to_location(places.into_iter().next().unwrap()).unwrap();

        assert_eq!(location.latitude, 47.6038321);
        assert_eq!(location.longitude, -122.330062);
        assert_eq!(location.components.get("state").map(String::as_str), Some("Washington"));
    }

    #[test]
    fn test_invalid_coordinate_is_remote_error() {
        let place = NominatimPlace {
            lat: "north".to_string(),
            lon: "0".to_string(),
            display_name: "x".to_string(),
            address: HashMap::new(),
        };
        assert!(matches!(to_location(place), Err(LookupError::Remote(_))));
    }
}
