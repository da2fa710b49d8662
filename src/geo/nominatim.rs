//! Nominatim geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API for geocoding.
//! Rate limit: 1 request per second, shared by forward and reverse lookups.

use crate::config::NetworkConfig;
use crate::coord::Point;
use crate::error::{Error, Result};
use crate::geo::{GeoLocation, Geocoder};
use crate::net::{self, RateLimiter};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Nominatim geocoding backend
#[derive(Debug)]
pub struct NominatimGeocoder {
    base_url: String,
    client: Client,
    limiter: RateLimiter,
    max_retries: u32,
}

/// Nominatim search response item
#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

/// Reverse lookups answer `{"error": ...}` when nothing is there
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
    Found(NominatimResult),
    Missing { error: String },
}

impl NominatimGeocoder {
    /// Create a new Nominatim backend
    pub fn new(base_url: &str, network: &NetworkConfig) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: net::build_client(network)?,
            limiter: RateLimiter::new(Duration::from_millis(network.min_interval_ms)),
            max_retries: network.max_retries,
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    fn reverse_url(&self, point: Point) -> String {
        format!(
            "{}/reverse?lat={}&lon={}&format=json",
            self.base_url, point.lat, point.lng
        )
    }

    /// Parse lat/lng strings to f64
    fn parse_coords(lat: &str, lng: &str) -> Result<(f64, f64)> {
        let lat: f64 = lat.parse().map_err(|_| {
            Error::Geocoding(format!("Invalid latitude: {}", lat))
        })?;
        let lng: f64 = lng.parse().map_err(|_| {
            Error::Geocoding(format!("Invalid longitude: {}", lng))
        })?;
        Ok((lat, lng))
    }

    fn into_location(result: NominatimResult) -> Result<GeoLocation> {
        let (lat, lng) = Self::parse_coords(&result.lat, &result.lon)?;
        Ok(GeoLocation {
            lat,
            lng,
            display_name: result.display_name,
        })
    }

    fn get_text(&self, url: &str) -> Result<String> {
        let response = net::get_with_retry(&self.client, &self.limiter, url, self.max_retries)?;
        response
            .text()
            .map_err(|e| Error::Geocoding(format!("Failed to read Nominatim response: {}", e)))
    }
}

fn parse_search(body: &str) -> Result<Option<NominatimResult>> {
    let results: Vec<NominatimResult> = serde_json::from_str(body)
        .map_err(|e| Error::Geocoding(format!("Failed to parse Nominatim response: {}", e)))?;
    Ok(results.into_iter().next())
}

fn parse_reverse(body: &str) -> Result<Option<NominatimResult>> {
    let response: ReverseResponse = serde_json::from_str(body)
        .map_err(|e| Error::Geocoding(format!("Failed to parse Nominatim response: {}", e)))?;
    match response {
        ReverseResponse::Found(result) => Ok(Some(result)),
        ReverseResponse::Missing { error } => {
            debug!(%error, "reverse lookup found nothing");
            Ok(None)
        }
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<GeoLocation>> {
        debug!(query, "geocoding");
        let body = self.get_text(&self.search_url(query))?;
        parse_search(&body)?.map(Self::into_location).transpose()
    }

    fn reverse(&self, point: Point) -> Result<Option<GeoLocation>> {
        let body = self.get_text(&self.reverse_url(point))?;
        parse_reverse(&body)?.map(Self::into_location).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> NominatimGeocoder {
        NominatimGeocoder::new("https://nominatim.example.org/", &NetworkConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_coords() {
        let (lat, lng) = NominatimGeocoder::parse_coords("50.1109", "8.6821").unwrap();
        assert!((lat - 50.1109).abs() < 0.0001);
        assert!((lng - 8.6821).abs() < 0.0001);
    }

    #[test]
    fn test_parse_coords_invalid() {
        assert!(NominatimGeocoder::parse_coords("invalid", "0").is_err());
        assert!(NominatimGeocoder::parse_coords("0", "invalid").is_err());
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(
            backend.search_url("Zoo Köln"),
            "https://nominatim.example.org/search?q=Zoo%20K%C3%B6ln&format=json&limit=1"
        );
        assert_eq!(
            backend.reverse_url(Point::new(50.5, 7.25)),
            "https://nominatim.example.org/reverse?lat=50.5&lon=7.25&format=json"
        );
    }

    #[test]
    fn test_parse_search_body() {
        let body = r#"[{"lat":"50.9","lon":"6.97","display_name":"Köln","importance":0.8}]"#;
        let hit = parse_search(body).unwrap().unwrap();
        let loc = NominatimGeocoder::into_location(hit).unwrap();
        assert_eq!(loc.display_name, "Köln");
        assert!((loc.lat - 50.9).abs() < 1e-9);

        assert!(parse_search("[]").unwrap().is_none());
        assert!(parse_search("<html>").is_err());
    }

    #[test]
    fn test_parse_reverse_body() {
        let body = r#"{"lat":"1.0","lon":"2.0","display_name":"Somewhere"}"#;
        assert!(parse_reverse(body).unwrap().is_some());
        assert!(parse_reverse(r#"{"error":"Unable to geocode"}"#).unwrap().is_none());
    }
}
