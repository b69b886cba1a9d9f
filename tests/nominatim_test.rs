mod common;

use common::{Route, StubServer};
use savorlocal::config::GeocoderConfig;
use savorlocal::geocode::{Geocoder, NominatimGeocoder};
use savorlocal::LookupError;

const SEATTLE: &str = r#"[{
    "place_id": 282983083,
    "lat": "47.6038321",
    "lon": "-122.330062",
    "display_name": "Seattle, King County, Washington, United States",
    "address": {"city": "Seattle", "county": "King County", "state": "Washington", "country": "United States", "country_code": "us"}
}]"#;

fn geocoder(base_url: &str) -> NominatimGeocoder {
    NominatimGeocoder::new(&GeocoderConfig {
        base_url: base_url.to_string(),
        user_agent: "savorlocal".to_string(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_geocode_match() {
    let server = StubServer::start(vec![Route::new("GET", "/search", 200, SEATTLE)]).await;

    let location = geocoder(&server.base_url)
        .geocode("Seattle, WA", true)
        .await
        .unwrap()
        .expect("a match");

    assert_eq!(location.address, "Seattle, King County, Washington, United States");
    assert_eq!(location.latitude, 47.6038321);
    assert_eq!(location.longitude, -122.330062);
    assert_eq!(location.components.get("city").map(String::as_str), Some("Seattle"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header("user-agent"), Some("savorlocal"));
    assert!(requests[0].target.contains("q=Seattle%2C+WA"));
    assert!(requests[0].target.contains("addressdetails=1"));
    assert!(requests[0].target.contains("limit=1"));
}

#[tokio::test]
async fn test_geocode_no_match_is_none() {
    let server = StubServer::start(vec![Route::new("GET", "/search", 200, "[]")]).await;

    let location = geocoder(&server.base_url)
        .geocode("zzzz nowhere", true)
        .await
        .unwrap();
    assert!(location.is_none());
}

#[tokio::test]
async fn test_geocoder_outage_is_remote_error() {
    let server = StubServer::start(vec![Route::new("GET", "/search", 503, "{}")]).await;

    let err = geocoder(&server.base_url)
        .geocode("Seattle, WA", true)
        .await
        .unwrap_err();
    assert!(matches!(err, LookupError::Remote(_)));
}
