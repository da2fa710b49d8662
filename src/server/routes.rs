//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::coord::Point;
use crate::error::Error;
use crate::format::{not_found, unknown_address, SearchReport};
use crate::search::{
    all_located, find_closest_n_points, find_closest_radius, get_detail, resolve_origin, Origin,
    OriginQuery,
};
use crate::server::state::AppState;
use crate::store::clean::ResolvedLocation;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/nearest", get(nearest_handler))
        .route("/api/radius", get(radius_handler))
        .route("/api/locations", get(locations_handler))
        .route("/api/locations/:id", get(location_handler))
        .with_state(state)
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::InvalidCoordinates(_) => (StatusCode::BAD_REQUEST, "INVALID_COORDINATES"),
            Error::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Error::Geocoding(_) => (StatusCode::BAD_GATEWAY, "GEOCODING_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        ApiError::new(status, code, err.to_string())
    }
}

/// Query parameters for nearest-N searches
#[derive(Debug, Default, Deserialize)]
pub struct NearestParams {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Free-text address, geocoded
    pub q: Option<String>,
    /// Number of results
    pub n: Option<usize>,
}

/// Query parameters for within-radius searches
#[derive(Debug, Default, Deserialize)]
pub struct RadiusParams {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Free-text address, geocoded
    pub q: Option<String>,
    /// Radius in km
    pub r: Option<f64>,
}

fn origin_query(lat: Option<f64>, lng: Option<f64>, q: Option<&str>) -> Result<OriginQuery, ApiError> {
    match (lat, lng, q) {
        (Some(lat), Some(lng), _) => Ok(OriginQuery::Point(Point::new(lat, lng))),
        (None, None, Some(q)) if !q.trim().is_empty() => Ok(OriginQuery::Address(q.trim().to_string())),
        _ => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "MISSING_ORIGIN",
            "Either lat and lng or q must be given",
        )),
    }
}

/// Resolve the origin off the async runtime
async fn locate(state: &AppState, query: OriginQuery) -> Result<Origin, ApiError> {
    let geocoder = Arc::clone(&state.geocoder);
    let address = match &query {
        OriginQuery::Address(address) => address.clone(),
        OriginQuery::Point(point) => point.to_string(),
    };

    let resolved = tokio::task::spawn_blocking(move || resolve_origin(geocoder.as_ref(), &query))
        .await
        .map_err(|e| Error::Server(format!("Geocoding task failed: {}", e)))??;

    resolved.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "UNKNOWN_ADDRESS", unknown_address(&address))
    })
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server is running
    pub running: bool,
    /// Server version
    pub version: String,
    /// Entries in the clean database
    pub locations: usize,
    /// Entries with resolved coordinates
    pub located: usize,
    /// Uptime in seconds
    pub uptime_secs: u64,
}

/// Server status endpoint
///
/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let db = state.clean_database().await?;

    Ok(Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        locations: db.len(),
        located: db.values().filter(|loc| loc.gps.is_some()).count(),
        uptime_secs: state.uptime_secs(),
    }))
}

/// Nearest-N search
///
/// GET /api/nearest?lat=..&lng=..[&n=..] or ?q=..[&n=..]
async fn nearest_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearestParams>,
) -> Result<Json<SearchReport>, ApiError> {
    let query = origin_query(params.lat, params.lng, params.q.as_deref())?;
    let n = params.n.unwrap_or(state.config.search.default_count);

    let origin = locate(&state, query).await?;
    let db = state.clean_database().await?;
    let hits = find_closest_n_points(&db, origin.point, n);
    debug!(origin = %origin.point, n, hits = hits.len(), "nearest query");

    Ok(Json(SearchReport {
        origin: Some(origin),
        hits,
    }))
}

/// Within-radius search
///
/// GET /api/radius?lat=..&lng=..[&r=..] or ?q=..[&r=..]
async fn radius_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RadiusParams>,
) -> Result<Json<SearchReport>, ApiError> {
    let query = origin_query(params.lat, params.lng, params.q.as_deref())?;
    let radius = params.r.unwrap_or(state.config.search.default_radius_km);
    if !radius.is_finite() || radius < 0.0 {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "INVALID_RADIUS",
            format!("Radius must be a non-negative number of km, got {}", radius),
        ));
    }

    let origin = locate(&state, query).await?;
    let db = state.clean_database().await?;
    let hits = find_closest_radius(&db, origin.point, radius);
    debug!(origin = %origin.point, radius, hits = hits.len(), "radius query");

    Ok(Json(SearchReport {
        origin: Some(origin),
        hits,
    }))
}

/// Every located entry
///
/// GET /api/locations
async fn locations_handler(State(state): State<Arc<AppState>>) -> Result<Json<SearchReport>, ApiError> {
    let db = state.clean_database().await?;
    Ok(Json(SearchReport {
        origin: None,
        hits: all_located(&db),
    }))
}

/// Single location response
#[derive(Debug, Serialize, Deserialize)]
pub struct LocationResponse {
    pub id: u64,
    pub location: ResolvedLocation,
}

/// Get a single location by ID
///
/// GET /api/locations/:id
async fn location_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<LocationResponse>, ApiError> {
    let db = state.clean_database().await?;
    get_detail(&db, id)
        .cloned()
        .map(|location| Json(LocationResponse { id, location }))
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", not_found(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::format::fixtures::location;
    use crate::geo::testing::MockGeocoder;
    use crate::store::clean::CleanDatabase;
    use crate::store::Store;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn create_test_state(geocoder: MockGeocoder) -> (TempDir, Arc<AppState>) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("raw.json"), dir.path().join("clean.json"));

        let mut db = CleanDatabase::new();
        db.insert(1000, location("Zoo", 50.1, 8.7));
        db.insert(1001, location("Dom", 50.11, 8.68));
        db.insert(1002, location("Ostsee", 54.0, 10.0));
        let mut unlocated = location("Irgendwo", 0.0, 0.0);
        unlocated.gps = None;
        db.insert(1003, unlocated);
        std::fs::write(store.clean_path(), serde_json::to_vec(&db).unwrap()).unwrap();

        let state = AppState::with_parts(Config::default(), store, Arc::new(geocoder));
        (dir, Arc::new(state))
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn hit_ids(value: &serde_json::Value) -> Vec<u64> {
        value["hits"]
            .as_array()
            .unwrap()
            .iter()
            .map(|hit| hit["id"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let status: StatusResponse = serde_json::from_slice(&body).unwrap();

        assert!(status.running);
        assert_eq!(status.locations, 4);
        assert_eq!(status.located, 3);
    }

    #[tokio::test]
    async fn test_nearest_by_point() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/nearest?lat=50.1&lng=8.7&n=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(hit_ids(&value), vec![1000, 1001]);
        assert_eq!(value["hits"][0]["distance_km"], 0.0);
        assert!(value["origin"].get("label").is_none());
    }

    #[tokio::test]
    async fn test_nearest_by_address() {
        let geocoder = MockGeocoder::new().with("Kiel", 54.32, 10.13);
        let (_dir, state) = create_test_state(geocoder);
        let (status, value) = get_json(state, "/api/nearest?q=Kiel&n=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(hit_ids(&value), vec![1002]);
        assert_eq!(value["origin"]["label"], "Kiel");
    }

    #[tokio::test]
    async fn test_nearest_unknown_address() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/nearest?q=Atlantis").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["code"], "UNKNOWN_ADDRESS");
        assert_eq!(value["error"], "Dieser Ort (Atlantis) wird nicht gefunden!");
    }

    #[tokio::test]
    async fn test_nearest_geocoder_unavailable() {
        let (_dir, state) = create_test_state(MockGeocoder::unavailable());
        let (status, value) = get_json(state, "/api/nearest?q=Kiel").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(value["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_nearest_missing_origin() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/nearest?n=3").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], "MISSING_ORIGIN");
    }

    #[tokio::test]
    async fn test_nearest_invalid_coordinates() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/nearest?lat=91&lng=8").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], "INVALID_COORDINATES");
    }

    #[tokio::test]
    async fn test_radius_endpoint() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/radius?lat=50.1&lng=8.7&r=5").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(hit_ids(&value), vec![1000, 1001]);
    }

    #[tokio::test]
    async fn test_radius_invalid() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/radius?lat=50.1&lng=8.7&r=-1").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], "INVALID_RADIUS");
    }

    #[tokio::test]
    async fn test_locations_endpoint() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/locations").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(hit_ids(&value), vec![1000, 1001, 1002]);
        assert!(value.get("origin").is_none());
    }

    #[tokio::test]
    async fn test_location_detail() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/locations/1003").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["id"], 1003);
        assert_eq!(value["location"]["name"], "Irgendwo");
    }

    #[tokio::test]
    async fn test_location_not_found() {
        let (_dir, state) = create_test_state(MockGeocoder::new());
        let (status, value) = get_json(state, "/api/locations/42").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["code"], "NOT_FOUND");
        assert_eq!(value["error"], "Die ID 42 scheint nicht gefunden zu werden ...");
    }
}
