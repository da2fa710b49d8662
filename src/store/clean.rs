//! Clean (query) database
//!
//! One flat record per location with a single resolved coordinate. Rebuilt
//! from the raw database on every save; never edited on its own.

use super::{timestamp, LocationRecord, RawDatabase};
use crate::constants::api::GOOGLE_MAPS_QUERY_URL;
use crate::coord::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Location ID to resolved location, ascending by ID
pub type CleanDatabase = BTreeMap<u64, ResolvedLocation>;

/// Where a resolved coordinate came from
///
/// Variants are ordered from most to least trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "corrected_gps")]
    Corrected,
    #[serde(rename = "gps")]
    Text,
    #[serde(rename = "full_name_gps")]
    FullName,
    #[serde(rename = "partial_name_gps")]
    PartialName,
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Corrected => "corrected",
            Provenance::Text => "text",
            Provenance::FullName => "full name",
            Provenance::PartialName => "partial name",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A location as served to queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub name: String,
    pub url: String,
    #[serde(with = "timestamp::option", default)]
    pub visited: Option<chrono::NaiveDateTime>,
    #[serde(with = "crate::coord::as_string", default)]
    pub gps: Option<Point>,
    #[serde(default)]
    pub gps_source: Option<Provenance>,
    #[serde(default)]
    pub gps_maps_link: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub limited: bool,
    #[serde(default)]
    pub location_description: String,
}

/// Pick the most trusted coordinate of a record
pub fn resolve(loc: &LocationRecord) -> Option<(Point, Provenance)> {
    [
        (loc.corrected_gps, Provenance::Corrected),
        (loc.gps, Provenance::Text),
        (loc.full_name_gps, Provenance::FullName),
        (loc.partial_name_gps, Provenance::PartialName),
    ]
    .into_iter()
    .find_map(|(point, source)| point.map(|p| (p, source)))
}

/// Google Maps link for a point
pub fn maps_link(point: Point) -> String {
    format!("{}{}", GOOGLE_MAPS_QUERY_URL, point)
}

/// Build the clean database from the raw one
pub fn project(db: &RawDatabase, limited_category: &str) -> CleanDatabase {
    let mut clean = CleanDatabase::new();
    for (cat, loc) in db.locations() {
        let resolved = resolve(loc);
        let gps = resolved.map(|(p, _)| p);
        clean.insert(
            loc.loc_id,
            ResolvedLocation {
                name: loc.name.clone(),
                url: loc.url.clone(),
                visited: Some(loc.visited),
                gps,
                gps_source: resolved.map(|(_, source)| source),
                gps_maps_link: gps.map(maps_link),
                category: cat.name.clone(),
                entry_date: loc.entry_date.clone(),
                limited: cat.name.trim() == limited_category,
                location_description: loc.location_description.clone().unwrap_or_default(),
            },
        );
    }
    clean
}
