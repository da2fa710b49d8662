//! Error types for coin-atlas

use thiserror::Error;

/// Main error type for coin-atlas operations
///
/// "No coordinate in this text" and "no geocoding match" are not errors;
/// those surface as `None` from the parser and the cascade.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    /// Transient outage of an external service (network down, 5xx, timeouts,
    /// throttling that did not clear). Worth retrying later, not right away.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Unexpected page structure: {0}")]
    Html(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl Error {
    /// Whether this error means an external service is down
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::ServiceUnavailable(_))
    }
}

/// Result type alias for coin-atlas operations
pub type Result<T> = std::result::Result<T, Error>;
