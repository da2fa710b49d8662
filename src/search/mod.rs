//! Proximity search over the clean database
//!
//! A linear scan: every entry with a resolved point gets its geodesic
//! distance to the origin computed. Entries without a point never show up
//! in results.

use crate::coord::Point;
use crate::error::Result;
use crate::geo::Geocoder;
use crate::store::clean::{CleanDatabase, ResolvedLocation};
use serde::Serialize;
use tracing::debug;

/// How a caller names the query origin
#[derive(Debug, Clone, PartialEq)]
pub enum OriginQuery {
    Point(Point),
    Address(String),
}

/// Where a query was asked from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Origin {
    pub point: Point,
    /// Address as entered or resolved, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Turn an origin query into a point
///
/// Addresses are geocoded; `Ok(None)` means the address is unknown.
/// Points are labelled by reverse geocoding when that works, and used
/// unlabelled when it does not.
pub fn resolve_origin(geocoder: &dyn Geocoder, query: &OriginQuery) -> Result<Option<Origin>> {
    match query {
        OriginQuery::Point(point) => {
            point.validate()?;
            let label = match geocoder.reverse(*point) {
                Ok(found) => found.map(|loc| loc.display_name),
                Err(e) => {
                    debug!(error = %e, "reverse geocoding failed, origin stays unlabelled");
                    None
                }
            };
            Ok(Some(Origin { point: *point, label }))
        }
        OriginQuery::Address(address) => Ok(geocoder.geocode(address)?.map(|loc| Origin {
            point: loc.point(),
            label: Some(loc.display_name),
        })),
    }
}

/// One located entry in a result list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: u64,
    pub location: ResolvedLocation,
    pub point: Point,
    /// Distance to the origin, absent for unranked listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

fn located(db: &CleanDatabase) -> impl Iterator<Item = (u64, &ResolvedLocation, Point)> {
    db.iter()
        .filter_map(|(&id, loc)| loc.gps.map(|point| (id, loc, point)))
}

fn with_distances(db: &CleanDatabase, origin: Point) -> impl Iterator<Item = ((u64, &ResolvedLocation, Point), f64)> {
    located(db).map(move |entry| {
        let distance = origin.distance_km(&entry.2);
        (entry, distance)
    })
}

fn into_hits(ranked: Vec<((u64, &ResolvedLocation, Point), f64)>) -> Vec<SearchHit> {
    ranked
        .into_iter()
        .map(|((id, location, point), distance)| SearchHit {
            id,
            location: location.clone(),
            point,
            distance_km: Some(distance),
        })
        .collect()
}

/// Candidates no farther than `radius`, nearest first
///
/// Ties keep their input order.
fn within_radius<T>(candidates: impl IntoIterator<Item = (T, f64)>, radius: f64) -> Vec<(T, f64)> {
    let mut hits: Vec<(T, f64)> = candidates
        .into_iter()
        .filter(|(_, distance)| *distance <= radius)
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

/// The `n` nearest candidates, nearest first
///
/// Keeps a bounded list: a candidate is admitted while the list is short
/// or when it beats the current farthest entry.
fn nearest_n<T>(candidates: impl IntoIterator<Item = (T, f64)>, n: usize) -> Vec<(T, f64)> {
    let mut best: Vec<(T, f64)> = Vec::with_capacity(n + 1);
    if n == 0 {
        return best;
    }
    for (item, distance) in candidates {
        let admit = best.len() < n || best.last().is_some_and(|(_, worst)| *worst > distance);
        if admit {
            best.push((item, distance));
            best.sort_by(|a, b| a.1.total_cmp(&b.1));
            best.truncate(n);
        }
    }
    best
}

/// All located entries within `radius_km` of `origin`, nearest first
pub fn find_closest_radius(db: &CleanDatabase, origin: Point, radius_km: f64) -> Vec<SearchHit> {
    into_hits(within_radius(with_distances(db, origin), radius_km))
}

/// The `n` located entries nearest to `origin`, nearest first
pub fn find_closest_n_points(db: &CleanDatabase, origin: Point, n: usize) -> Vec<SearchHit> {
    into_hits(nearest_n(with_distances(db, origin), n))
}

/// Look up one entry by ID
pub fn get_detail(db: &CleanDatabase, id: u64) -> Option<&ResolvedLocation> {
    db.get(&id)
}

/// Every located entry in ID order, without distances
pub fn all_located(db: &CleanDatabase) -> Vec<SearchHit> {
    located(db)
        .map(|(id, location, point)| SearchHit {
            id,
            location: location.clone(),
            point,
            distance_km: None,
        })
        .collect()
}
