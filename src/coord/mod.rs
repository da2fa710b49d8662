//! Geographic points
//!
//! This module handles:
//! - The `Point` type shared by the parser, the stores and the search
//! - Geodesic distance on the WGS84 ellipsoid
//! - Free-text coordinate parsing (see [`parse`])

pub mod parse;

use crate::error::{Error, Result};
use geo::GeodesicDistance;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A geographic coordinate in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    /// Create a point without range checks
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Create a point, rejecting out-of-range values
    pub fn try_new(lat: f64, lng: f64) -> Result<Self> {
        let point = Self::new(lat, lng);
        point.validate()?;
        Ok(point)
    }

    /// Validate that coordinates are within valid ranges
    ///
    /// Latitude: -90 to 90
    /// Longitude: -180 to 180
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || self.lat < -90.0 || self.lat > 90.0 {
            return Err(Error::InvalidCoordinates(format!(
                "Latitude {} is out of range [-90, 90]",
                self.lat
            )));
        }
        if !self.lng.is_finite() || self.lng < -180.0 || self.lng > 180.0 {
            return Err(Error::InvalidCoordinates(format!(
                "Longitude {} is out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }

    /// Geodesic distance to another point in kilometers
    pub fn distance_km(&self, other: &Point) -> f64 {
        distance_km(*self, *other)
    }
}

/// `lat,lng` - the form coordinates take inside the stores
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for Point {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidCoordinates(format!("Expected 'lat,lng', got '{}'", s)))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| Error::InvalidCoordinates(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| Error::InvalidCoordinates(format!("Invalid longitude: {}", lng)))?;
        Point::try_new(lat, lng)
    }
}

impl From<Point> for geo::Point<f64> {
    fn from(p: Point) -> Self {
        // geo uses (x, y) = (lng, lat)
        geo::Point::new(p.lng, p.lat)
    }
}

/// Geodesic (ellipsoidal) distance between two points in kilometers
pub fn distance_km(a: Point, b: Point) -> f64 {
    let a: geo::Point<f64> = a.into();
    let b: geo::Point<f64> = b.into();
    a.geodesic_distance(&b) / 1000.0
}

/// Serde helpers storing an optional point as the string `"lat,lng"`
pub mod as_string {
    use super::Point;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(point: &Option<Point>, serializer: S) -> Result<S::Ok, S::Error> {
        match point {
            Some(p) => serializer.serialize_some(&p.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Point>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.trim().is_empty() => s.parse().map(Some).map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
