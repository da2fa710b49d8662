//! Output formatters
//!
//! Provides trait-based output formatting for search results, plus the
//! fixed messages and the detail card shown for a single location.

pub mod gpx;
pub mod json;
pub mod text;
pub mod url;

use crate::config::Config;
use crate::error::Result;
use crate::search::SearchHit;
use crate::store::clean::ResolvedLocation;
use crate::store::timestamp;
use serde::{Deserialize, Serialize};

/// Shown when a query has no hits
pub const NOTHING_FOUND: &str = "Leider wurde kein Automat gefunden.";

/// Shown when a detail lookup misses
pub fn not_found(id: u64) -> String {
    format!("Die ID {} scheint nicht gefunden zu werden ...", id)
}

/// Shown when an address cannot be geocoded
pub fn unknown_address(query: &str) -> String {
    format!("Dieser Ort ({}) wird nicht gefunden!", query)
}

pub use crate::search::Origin;

/// A query result ready for output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    pub hits: Vec<SearchHit>,
}

/// Information about an output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Format name
    pub name: String,
    /// Format description
    pub description: String,
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Get the format name
    fn name(&self) -> &str;

    /// Get the format description
    fn description(&self) -> &str;

    /// Format a search report
    ///
    /// `config` supplies the summary limit and URL providers.
    fn format(&self, report: &SearchReport, config: &Config) -> Result<String>;
}

/// Get a formatter by name
pub fn get_formatter(name: &str) -> Option<Box<dyn OutputFormatter>> {
    match name.to_lowercase().as_str() {
        "json" => Some(Box::new(json::JsonFormatter)),
        "text" => Some(Box::new(text::TextFormatter)),
        "gpx" => Some(Box::new(gpx::GpxFormatter)),
        "url" => Some(Box::new(url::UrlFormatter)),
        _ => None,
    }
}

/// List all available formatters
pub fn available_formats() -> Vec<FormatInfo> {
    [
        json::JsonFormatter.info(),
        text::TextFormatter.info(),
        gpx::GpxFormatter.info(),
        url::UrlFormatter.info(),
    ]
    .into()
}

trait Describe {
    fn info(&self) -> FormatInfo;
}

impl<F: OutputFormatter> Describe for F {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Markdown card with every field of one location
pub fn detail_card(id: u64, loc: &ResolvedLocation) -> String {
    let gps = loc.gps.map(|p| p.to_string()).unwrap_or_default();
    let source = loc.gps_source.map(|s| s.to_string()).unwrap_or_default();
    let visited = loc.visited.as_ref().map(timestamp::format).unwrap_or_default();
    let fields: [(&str, String); 10] = [
        ("name", loc.name.clone()),
        ("url", loc.url.clone()),
        ("category", loc.category.clone()),
        ("gps", gps),
        ("gps_source", source),
        ("gps_maps_link", loc.gps_maps_link.clone().unwrap_or_default()),
        ("entry_date", loc.entry_date.clone().unwrap_or_default()),
        ("visited", visited),
        ("limited", if loc.limited { "ja" } else { "nein" }.to_string()),
        ("location_description", loc.location_description.clone()),
    ];

    let mut card = format!("*ID*: {}", id);
    for (key, value) in fields {
        if !value.is_empty() {
            card.push_str(&format!("\n- *{}*: _{}_", key, value));
        }
    }
    card
}
