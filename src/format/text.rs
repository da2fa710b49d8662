//! Human-readable text output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::{OutputFormatter, SearchReport, NOTHING_FOUND};

/// Text formatter - outputs the summary sent back for a query
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable summary"
    }

    fn format(&self, report: &SearchReport, config: &Config) -> Result<String> {
        if report.hits.is_empty() {
            return Ok(NOTHING_FOUND.to_string());
        }

        let limit = config.search.summary_limit;
        let mut output = String::new();

        if let Some(label) = report.origin.as_ref().and_then(|o| o.label.as_deref()) {
            output.push_str(&format!("*Eingegebener Standort*: {}\n", label));
        }

        for hit in report.hits.iter().take(limit) {
            output.push_str(&format!("\n*{}*: {}", hit.id, hit.location.name));
            if let Some(distance) = hit.distance_km {
                output.push_str(&format!(" ({:.1} km)", distance));
            }
        }

        if report.hits.len() > limit {
            output.push_str(&format!(
                "\n... (nur die ersten {} Einträge werden angezeigt)",
                limit
            ));
        }

        Ok(output)
    }
}
