//! GPX output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::{OutputFormatter, SearchReport};

/// GPX formatter - outputs a waypoint file for map apps
pub struct GpxFormatter;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl OutputFormatter for GpxFormatter {
    fn name(&self) -> &str {
        "gpx"
    }

    fn description(&self) -> &str {
        "GPX waypoint file"
    }

    fn format(&self, report: &SearchReport, _config: &Config) -> Result<String> {
        let mut gpx = String::new();

        // XML header
        gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        gpx.push('\n');
        gpx.push_str(r#"<gpx version="1.1" creator="coin-atlas">"#);
        gpx.push('\n');

        gpx.push_str("  <metadata>\n");
        gpx.push_str(&format!("    <name>coin-atlas: {} Standorte</name>\n", report.hits.len()));
        gpx.push_str("  </metadata>\n");

        if let Some(origin) = &report.origin {
            gpx.push_str(&format!(
                r#"  <wpt lat="{}" lon="{}">"#,
                origin.point.lat, origin.point.lng
            ));
            gpx.push('\n');
            gpx.push_str("    <name>Eingegebener Standort</name>\n");
            if let Some(label) = &origin.label {
                gpx.push_str(&format!("    <desc>{}</desc>\n", escape_xml(label)));
            }
            gpx.push_str("    <sym>flag</sym>\n");
            gpx.push_str("  </wpt>\n");
        }

        for hit in &report.hits {
            gpx.push_str(&format!(
                r#"  <wpt lat="{}" lon="{}">"#,
                hit.point.lat, hit.point.lng
            ));
            gpx.push('\n');
            gpx.push_str(&format!(
                "    <name>{}: {}</name>\n",
                hit.id,
                escape_xml(&hit.location.name)
            ));

            let mut desc = hit.location.category.clone();
            if let Some(distance) = hit.distance_km {
                desc.push_str(&format!(", {:.1} km", distance));
            }
            gpx.push_str(&format!("    <desc>{}</desc>\n", escape_xml(&desc)));

            if !hit.location.url.is_empty() {
                gpx.push_str(&format!(
                    "    <link href=\"{}\"/>\n",
                    escape_xml(&hit.location.url)
                ));
            }
            // Limited-time machines get their own symbol
            let symbol = if hit.location.limited { "circle" } else { "pin" };
            gpx.push_str(&format!("    <sym>{}</sym>\n", symbol));
            gpx.push_str("  </wpt>\n");
        }

        gpx.push_str("</gpx>\n");
        Ok(gpx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::fixtures::report;

    #[test]
    fn test_gpx_format() {
        let output = GpxFormatter.format(&report(2), &Config::default()).unwrap();

        // Verify GPX structure
        assert!(output.contains(r#"<?xml version="1.0""#));
        assert!(output.contains(r#"<gpx version="1.1""#));
        assert_eq!(output.matches("<wpt").count(), 3);
        assert!(output.contains("<name>Eingegebener Standort</name>"));
        assert!(output.contains("<name>1001: Ort 1</name>"));
        assert!(output.contains("<desc>Hessen, 1.1 km</desc>"));
        assert!(output.ends_with("</gpx>\n"));
    }

    #[test]
    fn test_gpx_escapes_names() {
        let mut report = report(1);
        report.origin = None;
        report.hits[0].location.name = "Café <Süd> & Nord".to_string();
        let output = GpxFormatter.format(&report, &Config::default()).unwrap();

        assert!(output.contains("1000: Café &lt;Süd&gt; &amp; Nord"));
        assert_eq!(output.matches("<wpt").count(), 1);
    }

    #[test]
    fn test_gpx_formatter_info() {
        let formatter = GpxFormatter;
        assert_eq!(formatter.name(), "gpx");
        assert!(!formatter.description().is_empty());
    }
}
