//! URL output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::{OutputFormatter, SearchReport, NOTHING_FOUND};

/// URL formatter - outputs one map URL per hit
pub struct UrlFormatter;

impl UrlFormatter {
    /// Format URLs with optional provider override
    pub fn format_with_provider(
        &self,
        report: &SearchReport,
        config: &Config,
        provider: Option<&str>,
    ) -> Result<String> {
        if report.hits.is_empty() {
            return Ok(NOTHING_FOUND.to_string());
        }

        let lines = report
            .hits
            .iter()
            .map(|hit| {
                let url = config.format_url(provider, hit.point.lat, hit.point.lng)?;
                Ok(format!("{}: {}", hit.id, url))
            })
            .collect::<Result<Vec<String>>>()?;
        Ok(lines.join("\n"))
    }
}

impl OutputFormatter for UrlFormatter {
    fn name(&self) -> &str {
        "url"
    }

    fn description(&self) -> &str {
        "Map URL per location"
    }

    fn format(&self, report: &SearchReport, config: &Config) -> Result<String> {
        self.format_with_provider(report, config, None)
    }
}
