//! Geocoding module
//!
//! Provides geocoding (location name to coordinates), reverse geocoding,
//! and the name-variant fallback cascade used by the crawler.

pub mod cascade;
pub mod nominatim;

use crate::config::Config;
use crate::coord::Point;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A geocoded location result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Display name (address or description)
    pub display_name: String,
}

impl GeoLocation {
    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lng)
    }
}

/// Trait for geocoding backends
///
/// Backends block the calling thread; async callers use `spawn_blocking`.
pub trait Geocoder: Send + Sync {
    /// Geocode a location string to coordinates
    ///
    /// Returns the best match for the query, or None if not found
    fn geocode(&self, query: &str) -> Result<Option<GeoLocation>>;

    /// Reverse geocode coordinates to a location name
    fn reverse(&self, point: Point) -> Result<Option<GeoLocation>>;
}

/// Get the default geocoding backend
pub fn get_geocoder(config: &Config) -> Result<nominatim::NominatimGeocoder> {
    nominatim::NominatimGeocoder::new(&config.geocoder.url, &config.network)
}

#[cfg(test)]
pub mod testing {
    //! Scripted geocoder for tests

    use super::{GeoLocation, Geocoder};
    use crate::coord::Point;
    use crate::error::{Error, Result};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct MockGeocoder {
        known: HashMap<String, (f64, f64)>,
        broken: HashSet<String>,
        down: bool,
        queries: Mutex<Vec<String>>,
    }

    impl MockGeocoder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, query: &str, lat: f64, lng: f64) -> Self {
            self.known.insert(query.to_string(), (lat, lng));
            self
        }

        /// Lookups of `query` fail with `Error::Geocoding`
        pub fn failing(mut self, query: &str) -> Self {
            self.broken.insert(query.to_string());
            self
        }

        /// Every call fails with `ServiceUnavailable`
        pub fn unavailable() -> Self {
            Self {
                down: true,
                ..Self::default()
            }
        }

        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl Geocoder for MockGeocoder {
        fn geocode(&self, query: &str) -> Result<Option<GeoLocation>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.down {
                return Err(Error::ServiceUnavailable("geocoder offline".to_string()));
            }
            if self.broken.contains(query) {
                return Err(Error::Geocoding(format!("bad response for {}", query)));
            }
            Ok(self.known.get(query).map(|&(lat, lng)| GeoLocation {
                lat,
                lng,
                display_name: query.to_string(),
            }))
        }

        fn reverse(&self, point: Point) -> Result<Option<GeoLocation>> {
            if self.down {
                return Err(Error::ServiceUnavailable("geocoder offline".to_string()));
            }
            Ok(self
                .known
                .iter()
                .find(|(_, &(lat, lng))| lat == point.lat && lng == point.lng)
                .map(|(name, &(lat, lng))| GeoLocation {
                    lat,
                    lng,
                    display_name: name.clone(),
                }))
        }
    }
}
