//! Name geocoding with fallback variants
//!
//! Forum titles often carry asides the geocoder cannot resolve, e.g.
//! `Zoo Duisburg „Delfinarium“ (Automat 2)`. The cascade tries the full
//! title first and then progressively stripped variants. Only the full
//! title counts as a confident match.

use crate::coord::Point;
use crate::error::Result;
use crate::geo::Geocoder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

static AUTO_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(Auto.*\)").expect("valid regex"));
static QUOTED_ASIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["„].*["“]"#).expect("valid regex"));
static PAREN_ASIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*\)").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// How much of the name the match was found for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameConfidence {
    FullName,
    PartialName,
}

/// A successful name lookup
#[derive(Debug, Clone, PartialEq)]
pub struct NameMatch {
    pub point: Point,
    pub confidence: NameConfidence,
    /// The query that produced the hit
    pub query: String,
    pub display_name: String,
}

fn strip(pattern: &Regex, s: &str) -> String {
    pattern.replace_all(s, " ").into_owned()
}

fn tidy(s: &str) -> String {
    SPACES.replace_all(s.trim(), " ").into_owned()
}

/// Queries tried for a name, in order, without empties or repeats
pub fn name_variants(name: &str) -> Vec<(String, NameConfidence)> {
    let without_auto = strip(&AUTO_ANNOTATION, name);
    let without_quote = strip(&QUOTED_ASIDE, &without_auto);
    let without_paren = strip(&PAREN_ASIDE, &without_auto);
    let without_both = strip(&QUOTED_ASIDE, &without_paren);

    let candidates = [
        (name.to_string(), NameConfidence::FullName),
        (without_quote, NameConfidence::PartialName),
        (without_paren, NameConfidence::PartialName),
        (without_both, NameConfidence::PartialName),
    ];

    let mut variants: Vec<(String, NameConfidence)> = Vec::new();
    for (query, confidence) in candidates {
        let query = tidy(&query);
        if query.is_empty() || variants.iter().any(|(q, _)| *q == query) {
            continue;
        }
        variants.push((query, confidence));
    }
    variants
}

/// Geocode a location name, falling back to stripped variants
///
/// `Ok(None)` means every variant was looked up and none matched.
/// Service outages propagate as `Error::ServiceUnavailable`.
pub fn find_name_gps(geocoder: &dyn Geocoder, name: &str) -> Result<Option<NameMatch>> {
    for (query, confidence) in name_variants(name) {
        if let Some(hit) = geocoder.geocode(&query)? {
            debug!(name, query = %query, ?confidence, "name geocoded");
            return Ok(Some(NameMatch {
                point: hit.point(),
                confidence,
                query,
                display_name: hit.display_name,
            }));
        }
    }
    debug!(name, "no geocoding match for any name variant");
    Ok(None)
}
