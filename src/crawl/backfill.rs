//! Coordinate backfill
//!
//! Fills coordinates for location entries that have none: first from the
//! GPS text of the post, then by geocoding the topic title.

use crate::coord::parse::find_gps;
use crate::error::Result;
use crate::geo::cascade::{find_name_gps, NameConfidence};
use crate::geo::Geocoder;
use crate::store::{LocationRecord, RawDatabase};
use tracing::{debug, info, warn};

/// Outcome of one backfill pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub examined: usize,
    pub from_text: usize,
    pub from_full_name: usize,
    pub from_partial_name: usize,
    pub unresolved: usize,
    /// Lookups the geocoder answered with an error other than an outage
    pub failed: usize,
}

fn needs_coordinates(loc: &LocationRecord) -> bool {
    loc.interesting && loc.corrected_gps.is_none() && !loc.has_automatic_gps()
}

/// Resolve coordinates for every location entry that lacks them
///
/// A geocoder outage ends the pass with `Error::ServiceUnavailable`.
/// Coordinates found before that stay in `db`. Any other lookup error only
/// skips the entry it happened on.
pub fn backfill_coordinates(db: &mut RawDatabase, geocoder: &dyn Geocoder) -> Result<BackfillSummary> {
    let mut summary = BackfillSummary::default();

    for loc in db.locations_mut().filter(|loc| needs_coordinates(loc)) {
        summary.examined += 1;

        if let Some(point) = loc.gps_text.as_deref().and_then(find_gps) {
            debug!(name = %loc.name, %point, "coordinates from text");
            loc.gps = Some(point);
            summary.from_text += 1;
            continue;
        }

        let found = match find_name_gps(geocoder, &loc.name) {
            Ok(found) => found,
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                warn!(name = %loc.name, error = %e, "name lookup failed, entry skipped");
                summary.failed += 1;
                continue;
            }
        };

        match found {
            Some(hit) => {
                debug!(name = %loc.name, query = %hit.query, ?hit.confidence, "coordinates from name");
                match hit.confidence {
                    NameConfidence::FullName => {
                        loc.full_name_gps = Some(hit.point);
                        summary.from_full_name += 1;
                    }
                    NameConfidence::PartialName => {
                        loc.partial_name_gps = Some(hit.point);
                        summary.from_partial_name += 1;
                    }
                }
            }
            None => summary.unresolved += 1,
        }
    }

    info!(
        examined = summary.examined,
        text = summary.from_text,
        full_name = summary.from_full_name,
        partial_name = summary.from_partial_name,
        unresolved = summary.unresolved,
        failed = summary.failed,
        "coordinate backfill finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Point;
    use crate::error::Error;
    use crate::geo::testing::MockGeocoder;
    use crate::store::{CategoryRecord, CategoryState};
    use chrono::NaiveDate;

    fn db_with(records: Vec<LocationRecord>) -> RawDatabase {
        let mut db = RawDatabase::default();
        let mut cat = CategoryRecord::new(0, "Cat", CategoryState::Unknown { visited: None });
        for mut record in records {
            record.loc_id = db.allocate_location_id();
            cat.location_list.push(record);
        }
        db.categories.insert("cat".to_string(), cat);
        db
    }

    fn entry(name: &str, gps_text: Option<&str>) -> LocationRecord {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        LocationRecord::location(name, format!("http://t/{}", name), now, String::new(), gps_text.map(String::from), None)
    }

    #[test]
    fn test_text_first_then_name() {
        let mut db = db_with(vec![
            entry("Zoo", Some("N 50° 12.345' E 8° 30.678'")),
            entry("Parkhaus (Automat 3)", Some("kaputt")),
            entry("Rathaus Bonn", None),
            entry("Nirgendwo", None),
        ]);
        let geocoder = MockGeocoder::new()
            .with("Parkhaus", 50.0, 8.0)
            .with("Rathaus Bonn", 50.73, 7.1);

        let summary = backfill_coordinates(&mut db, &geocoder).unwrap();
        assert_eq!(
            summary,
            BackfillSummary {
                examined: 4,
                from_text: 1,
                from_full_name: 1,
                from_partial_name: 1,
                unresolved: 1,
                failed: 0,
            }
        );

        let locs: Vec<&LocationRecord> = db.locations().map(|(_, loc)| loc).collect();
        assert!(locs[0].gps.is_some());
        assert!(locs[0].full_name_gps.is_none());
        assert_eq!(locs[1].partial_name_gps, Some(Point::new(50.0, 8.0)));
        assert_eq!(locs[2].full_name_gps, Some(Point::new(50.73, 7.1)));
        // The text-located entry never reached the geocoder
        assert!(!geocoder.queries().iter().any(|q| q == "Zoo"));
    }

    #[test]
    fn test_skips_located_and_other_entries() {
        let mut located = entry("A", None);
        located.partial_name_gps = Some(Point::new(1.0, 1.0));
        let mut corrected = entry("B", None);
        corrected.corrected_gps = Some(Point::new(2.0, 2.0));
        let mut other = entry("C", None);
        other.interesting = false;

        let mut db = db_with(vec![located, corrected, other]);
        let geocoder = MockGeocoder::new();
        let summary = backfill_coordinates(&mut db, &geocoder).unwrap();
        assert_eq!(summary.examined, 0);
        assert!(geocoder.queries().is_empty());
    }

    #[test]
    fn test_outage_aborts_pass_and_keeps_progress() {
        let mut db = db_with(vec![
            entry("Zoo", Some("50.1, 8.6")),
            entry("Rathaus", None),
            entry("Museum", Some("52.5, 13.4")),
        ]);
        let geocoder = MockGeocoder::unavailable();

        let err = backfill_coordinates(&mut db, &geocoder).unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
        assert_eq!(geocoder.queries(), vec!["Rathaus"]);

        let locs: Vec<&LocationRecord> = db.locations().map(|(_, loc)| loc).collect();
        assert_eq!(locs[0].gps, Some(Point::new(50.1, 8.6)));
        assert!(locs[2].gps.is_none());
    }

    #[test]
    fn test_lookup_error_skips_only_that_entry() {
        let mut db = db_with(vec![
            entry("Kaputt", None),
            entry("Rathaus", None),
            entry("Museum", None),
        ]);
        let geocoder = MockGeocoder::new()
            .failing("Kaputt")
            .with("Rathaus", 50.73, 7.1)
            .with("Museum", 52.5, 13.4);

        let summary = backfill_coordinates(&mut db, &geocoder).unwrap();
        assert_eq!(summary.examined, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.from_full_name, 2);

        let locs: Vec<&LocationRecord> = db.locations().map(|(_, loc)| loc).collect();
        assert!(locs[0].full_name_gps.is_none());
        assert_eq!(locs[1].full_name_gps, Some(Point::new(50.73, 7.1)));
        assert_eq!(locs[2].full_name_gps, Some(Point::new(52.5, 13.4)));
    }
}
