//! Free-text coordinate parsing
//!
//! Forum authors write coordinates in every notation imaginable: degrees,
//! minutes and seconds with assorted quote glyphs, decimal degrees with a
//! comma as decimal separator, German `O` for east, missing separators
//! between latitude and longitude. Parsing happens in two stages:
//!
//! 1. A fixed pipeline of textual repairs. Each repair is a small named
//!    function that can be tested on its own; the order is significant.
//! 2. A strict parser accepting decimal or DMS notation with hemisphere
//!    letters.
//!
//! Anything the strict parser rejects is "no coordinate here", reported as
//! `None`. Malformed input never produces an error.

use super::Point;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Inputs shorter than this cannot hold a coordinate pair
const MIN_INPUT_CHARS: usize = 8;

/// A single textual repair step
pub type Repair = fn(&str) -> String;

/// Repairs applied before strict parsing, in order
pub const REPAIRS: [(&str, Repair); 7] = [
    ("normalize_glyphs", normalize_glyphs),
    ("separate_hemispheres", separate_hemispheres),
    ("repair_dms_marks", repair_dms_marks),
    ("repair_decimal_commas", repair_decimal_commas),
    ("repair_decimal_pair", repair_decimal_pair),
    ("repair_spaced_degrees", repair_spaced_degrees),
    ("repair_four_groups", repair_four_groups),
];

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static coordinate pattern must compile")
}

static PAREN_ASIDE: LazyLock<Regex> = LazyLock::new(|| regex(r"\(.*\)"));
static BRACKET_ASIDE: LazyLock<Regex> = LazyLock::new(|| regex(r"\[.*\]"));
static NORTH_SOUTH: LazyLock<Regex> = LazyLock::new(|| regex(r"[NS]"));

static MINUTES_UNMARKED: LazyLock<Regex> = LazyLock::new(|| regex(r"(\d+°\s*\d+[.,]\d+)[^'\d]"));
static MINUTES_UNMARKED_END: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+°\s*\d+[.,]\d+$"));
static SECONDS_UNMARKED: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(\d+°\s*\d+'\s*\d+[.,]?\d+)[^'\d.,]"));
static SECONDS_UNMARKED_END: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+°\s*\d+'\s*\d+[.,]\d+$"));

static DECIMAL_COMMA: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+(,)\d+['°]"));
static DECIMAL_PAIR: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^[NS]?\s*\d+,\d+\s*[NS]?\s*[/ ]\s*[WE]?\s*\d+,\d+\s*[WE]?$"));
static SPACED_DEGREES: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^[NS]?\s*(\d+)\s+([\d.]+)\s*[NS]?[\s/,]+[WE]?\s*(\d+)\s+([\d.]+)\s*[WE]?$")
});
static DISPLAY_PAIR: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*[+-]?\d+(?:\.\d+)?,[+-]?\d+(?:\.\d+)?\s*$"));
static FOUR_GROUPS: LazyLock<Regex> = LazyLock::new(|| regex(r"^[0-9, ]+$"));

static STRICT_POINT: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r#"(?x)
        ^.*?
        (?P<lat_front>[NS])?[\ ]*
        (?P<lat_deg>[+-]?\d+(?:\.\d+)?)
        (?:[°D*\s][\ ]*
            (?:(?P<lat_min>\d+(?:\.\d+)?)[′'m][\ ]*)?
            (?:(?P<lat_sec>\d+(?:\.\d+)?)(?:''|[″"s])[\ ]*)?
        )?
        (?P<lat_back>[NS])?
        \s*[,;/\s]\s*
        (?P<lng_front>[EW])?[\ ]*
        (?P<lng_deg>[+-]?\d+(?:\.\d+)?)
        (?:[°D*\s][\ ]*
            (?:(?P<lng_min>\d+(?:\.\d+)?)[′'m][\ ]*)?
            (?:(?P<lng_sec>\d+(?:\.\d+)?)(?:''|[″"s])[\ ]*)?
        )?
        (?P<lng_back>[EW])?
        (?:\s*[,;/\s]\s*[+-]?\d+(?:\.\d+)?[\ ]*(?:km|m|mi|ft|nm|nmi))?
        \s*$
        "#,
    )
});

/// Extract a coordinate pair from free text
///
/// Returns `None` when the text holds no recoverable coordinate.
pub fn find_gps(text: &str) -> Option<Point> {
    // `Point`'s own `lat,lng` form may be shorter than the gate
    if DISPLAY_PAIR.is_match(text) {
        return parse_point(text.trim());
    }
    if text.chars().count() < MIN_INPUT_CHARS {
        return None;
    }

    let mut current = text.to_string();
    for (name, repair) in REPAIRS {
        let next = repair(&current);
        if next != current {
            trace!(step = name, before = %current, after = %next, "coordinate repair");
        }
        current = next;
    }

    parse_point(&current)
}

/// Unify quote glyphs, `O` for east, separators; drop asides in brackets
pub fn normalize_glyphs(s: &str) -> String {
    let replaced = s
        .replace('O', "E")
        .replace(['`', '′', '’', '´'], "'")
        .replace(['"', '″'], "''")
        .replace("- ", "/ ")
        .replace(';', "/")
        .replace("-E", " / E")
        .replace('+', "");

    let without_parens = PAREN_ASIDE.replace_all(&replaced, "");
    BRACKET_ASIDE.replace_all(&without_parens, "").into_owned()
}

/// Split glued pairs such as `N50.1E8.2` by inserting a space
///
/// A string starting with N/S gets a space before its first E/W; otherwise a
/// string ending in E/W gets a space after its first N/S.
pub fn separate_hemispheres(s: &str) -> String {
    let mut out = s.to_string();
    if s.starts_with(['N', 'S']) {
        if let Some(idx) = s.find(['E', 'W']) {
            out.insert(idx, ' ');
        }
    } else if s.ends_with(['E', 'W']) {
        if let Some(m) = NORTH_SOUTH.find(s) {
            out.insert(m.end(), ' ');
        }
    }
    out
}

/// Add missing minute (`'`) and second (`''`) marks after decimal values
///
/// Only applies to strings using a degree sign.
pub fn repair_dms_marks(s: &str) -> String {
    if !s.contains('°') {
        return s.to_string();
    }

    let mut out = insert_after_captures(s, &MINUTES_UNMARKED, "'");
    if MINUTES_UNMARKED_END.is_match(&out) {
        out.push('\'');
    }

    out = insert_after_captures(&out, &SECONDS_UNMARKED, "''");
    if SECONDS_UNMARKED_END.is_match(&out) {
        out.push_str("''");
    }
    out
}

/// Insert `mark` at the end of capture group 1 of every match.
///
/// Walks the matches back to front so earlier offsets stay valid.
fn insert_after_captures(s: &str, re: &Regex, mark: &str) -> String {
    let offsets: Vec<usize> = re
        .captures_iter(s)
        .filter_map(|caps| caps.get(1).map(|m| m.end()))
        .collect();

    let mut out = s.to_string();
    for idx in offsets.into_iter().rev() {
        out.insert_str(idx, mark);
    }
    out
}

/// `50,123°` or `12,5'` use a decimal comma; rewrite it to a period
pub fn repair_decimal_commas(s: &str) -> String {
    let mut out = s.to_string();
    while let Some(comma) = DECIMAL_COMMA
        .captures(&out)
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
    {
        out.replace_range(comma, ".");
    }
    out
}

/// `50,2057 N / 8,5113 E`: both numbers use decimal commas
pub fn repair_decimal_pair(s: &str) -> String {
    if DECIMAL_PAIR.is_match(s) {
        s.replace(',', ".")
    } else {
        s.to_string()
    }
}

/// `N 50 12.345 E 8 30.678`: degrees and minutes split by whitespace only
pub fn repair_spaced_degrees(s: &str) -> String {
    let Some(caps) = SPACED_DEGREES.captures(s) else {
        return s.to_string();
    };

    let ends: Vec<usize> = (1..=4).filter_map(|i| caps.get(i).map(|m| m.end())).collect();
    let [deg_lat, min_lat, deg_lng, min_lng] = ends[..] else {
        return s.to_string();
    };

    format!(
        "{}°{}'{}°{}'{}",
        &s[..deg_lat],
        &s[deg_lat..min_lat],
        &s[min_lat..deg_lng],
        &s[deg_lng..min_lng],
        &s[min_lng..]
    )
}

/// `42,7481690, 25,3212971`: four comma groups are two decimal numbers
pub fn repair_four_groups(s: &str) -> String {
    let groups: Vec<&str> = s.split(',').collect();
    if groups.len() == 4 && FOUR_GROUPS.is_match(s) {
        format!(
            "{}.{},{}.{}",
            groups[0].trim(),
            groups[1].trim(),
            groups[2].trim(),
            groups[3].trim()
        )
    } else {
        s.to_string()
    }
}

/// Strict parser for normalized coordinate strings
///
/// Accepts decimal degrees or degrees/minutes/seconds, with hemisphere
/// letters before or after each half. S and W negate.
pub fn parse_point(s: &str) -> Option<Point> {
    let caps = STRICT_POINT.captures(s)?;

    let component = |deg: &str, min: &str, sec: &str, front: &str, back: &str, negative: &str| {
        let degrees: f64 = caps.name(deg)?.as_str().parse().ok()?;
        let minutes: f64 = caps.name(min).map_or(Some(0.0), |m| m.as_str().parse().ok())?;
        let seconds: f64 = caps.name(sec).map_or(Some(0.0), |m| m.as_str().parse().ok())?;

        let magnitude = degrees.abs() + minutes / 60.0 + seconds / 3600.0;
        let hemisphere = caps.name(front).or_else(|| caps.name(back)).map(|m| m.as_str());
        let is_negative = degrees.is_sign_negative() || hemisphere == Some(negative);

        Some(if is_negative { -magnitude } else { magnitude })
    };

    let lat = component("lat_deg", "lat_min", "lat_sec", "lat_front", "lat_back", "S")?;
    let lng = component("lng_deg", "lng_min", "lng_sec", "lng_front", "lng_back", "W")?;

    Point::try_new(lat, lng).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_point(text: &str, lat: f64, lng: f64) {
        let point = find_gps(text).unwrap_or_else(|| panic!("'{}' should parse", text));
        assert_relative_eq!(point.lat, lat, epsilon = 1e-6);
        assert_relative_eq!(point.lng, lng, epsilon = 1e-6);
    }

    #[test]
    fn test_degrees_decimal_minutes() {
        assert_point("N 50° 12.345' E 8° 30.678'", 50.20575, 8.5113);
    }

    #[test]
    fn test_comma_decimal_pair() {
        assert_point("50,2057 N / 8,5113 E", 50.2057, 8.5113);
    }

    #[test]
    fn test_garbage_is_not_parseable() {
        assert!(find_gps("garbage text no coords").is_none());
    }

    #[test]
    fn test_short_input_is_not_parseable() {
        assert!(find_gps("50 8").is_none());
        assert!(find_gps("").is_none());
    }

    #[test]
    fn test_full_dms_with_double_quotes() {
        assert_point(
            "N 50° 12' 20.7\" E 8° 30' 40.7\"",
            50.0 + 12.0 / 60.0 + 20.7 / 3600.0,
            8.0 + 30.0 / 60.0 + 40.7 / 3600.0,
        );
    }

    #[test]
    fn test_alternate_glyphs_and_ost() {
        assert_point("N 50° 12.345´ O 8° 30.678′", 50.20575, 8.5113);
        assert_point("N 50° 12.345’ E 8° 30.678`", 50.20575, 8.5113);
    }

    #[test]
    fn test_missing_minute_marks() {
        assert_point("N 50° 12.345 E 8° 30.678", 50.20575, 8.5113);
    }

    #[test]
    fn test_decimal_comma_minutes() {
        assert_point("N 50° 12,345' E 8° 30,678'", 50.20575, 8.5113);
    }

    #[test]
    fn test_decimal_comma_degrees() {
        assert_point("50,2057° N, 8,5113° E", 50.2057, 8.5113);
    }

    #[test]
    fn test_spaced_degrees_and_minutes() {
        assert_point("N 50 12.345 E 8 30.678", 50.20575, 8.5113);
    }

    #[test]
    fn test_four_comma_groups() {
        assert_point("42,7481690, 25,3212971", 42.748169, 25.3212971);
    }

    #[test]
    fn test_plain_decimal() {
        assert_point("50.110924, 8.682127", 50.110924, 8.682127);
    }

    #[test]
    fn test_aside_is_ignored() {
        assert_point("N 50° 12.345' E 8° 30.678' (Eingang Süd)", 50.20575, 8.5113);
        assert_point("N 50° 12.345' E 8° 30.678' [geschätzt]", 50.20575, 8.5113);
    }

    #[test]
    fn test_southern_western_hemispheres() {
        assert_point(
            "S 33° 51.5' W 151° 12.5'",
            -(33.0 + 51.5 / 60.0),
            -(151.0 + 12.5 / 60.0),
        );
    }

    #[test]
    fn test_out_of_range_is_not_parseable() {
        assert!(find_gps("95.000, 8.000").is_none());
        assert!(find_gps("45.000, 190.000").is_none());
    }

    #[test]
    fn test_round_trip() {
        let inputs = [
            "N 50° 12.345' E 8° 30.678'",
            "50,2057 N / 8,5113 E",
            "S 33° 51.5' W 151° 12.5'",
            "42,7481690, 25,3212971",
            "N 1.5 E 2.5 ",
        ];
        for input in inputs {
            let point = find_gps(input).unwrap();
            let serialized = format!("{:.9}, {:.9}", point.lat, point.lng);
            let again = find_gps(&serialized).unwrap();
            assert_relative_eq!(point.lat, again.lat, epsilon = 1e-8);
            assert_relative_eq!(point.lng, again.lng, epsilon = 1e-8);

            let displayed = find_gps(&point.to_string()).unwrap();
            assert_relative_eq!(point.lat, displayed.lat, epsilon = 1e-9);
            assert_relative_eq!(point.lng, displayed.lng, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_short_display_round_trip() {
        for point in [
            Point::new(1.5, 2.5),
            Point::new(50.0, 8.0),
            Point::new(-33.5, -151.25),
            Point::new(0.0, 0.0),
        ] {
            assert_eq!(find_gps(&point.to_string()), Some(point), "{}", point);
        }
        assert_point("50,8", 50.0, 8.0);
        assert_point(" 1.5,2.5 ", 1.5, 2.5);
        assert!(find_gps("95,8").is_none());
        assert!(find_gps("50 8").is_none());
    }

    #[test]
    fn test_normalize_glyphs() {
        assert_eq!(normalize_glyphs("N 50°12´ O 8°30`"), "N 50°12' E 8°30'");
        assert_eq!(normalize_glyphs("1\"2″"), "1''2''");
        assert_eq!(normalize_glyphs("50.1; 8.2"), "50.1/ 8.2");
        assert_eq!(normalize_glyphs("+50.1 - 8.2"), "50.1 / 8.2");
        assert_eq!(normalize_glyphs("50.1 (Parkplatz) 8.2"), "50.1  8.2");
        assert_eq!(normalize_glyphs("50.1 [alt] 8.2"), "50.1  8.2");
    }

    #[test]
    fn test_separate_hemispheres() {
        assert_eq!(separate_hemispheres("N50.1E8.2"), "N50.1 E8.2");
        assert_eq!(separate_hemispheres("50.1N8.2E"), "50.1N 8.2E");
        assert_eq!(separate_hemispheres("N50.1"), "N50.1");
        assert_eq!(separate_hemispheres("50.1 8.2E"), "50.1 8.2E");
    }

    #[test]
    fn test_repair_dms_marks() {
        assert_eq!(repair_dms_marks("N 50° 12.345 E 8° 30.678"), "N 50° 12.345' E 8° 30.678'");
        assert_eq!(
            repair_dms_marks("N 50° 12' 20.5 E 8° 30' 40.5"),
            "N 50° 12' 20.5'' E 8° 30' 40.5''"
        );
        assert_eq!(repair_dms_marks("50.1 8.2"), "50.1 8.2");
    }

    #[test]
    fn test_repair_decimal_commas() {
        assert_eq!(repair_decimal_commas("50,12° 8,5°"), "50.12° 8.5°");
        assert_eq!(repair_decimal_commas("12,5' x"), "12.5' x");
        assert_eq!(repair_decimal_commas("50,1 8,2"), "50,1 8,2");
    }

    #[test]
    fn test_repair_decimal_pair() {
        assert_eq!(repair_decimal_pair("50,1 N / 8,2 E"), "50.1 N / 8.2 E");
        assert_eq!(repair_decimal_pair("50,1 8,2"), "50.1 8.2");
        assert_eq!(repair_decimal_pair("50,1, 8,2"), "50,1, 8,2");
    }

    #[test]
    fn test_repair_spaced_degrees() {
        assert_eq!(
            repair_spaced_degrees("N 50 12.345 E 8 30.678"),
            "N 50° 12.345' E 8° 30.678'"
        );
        assert_eq!(repair_spaced_degrees("50.1 8.2"), "50.1 8.2");
    }

    #[test]
    fn test_repair_four_groups() {
        assert_eq!(repair_four_groups("42,7481690, 25,3212971"), "42.7481690,25.3212971");
        assert_eq!(repair_four_groups("N 42,1, 25,3, 1"), "N 42,1, 25,3, 1");
        assert_eq!(repair_four_groups("1,2,3"), "1,2,3");
    }

    #[test]
    fn test_parse_point_strict() {
        let p = parse_point("N 50° 12.345' E 8° 30.678'").unwrap();
        assert_relative_eq!(p.lat, 50.20575, epsilon = 1e-9);

        let p = parse_point("50.5 N, 8.25 W").unwrap();
        assert_relative_eq!(p.lng, -8.25, epsilon = 1e-9);

        let p = parse_point("Koordinaten: 50.5, 8.25").unwrap();
        assert_relative_eq!(p.lat, 50.5, epsilon = 1e-9);

        assert!(parse_point("no digits here").is_none());
    }
}
