//! Server shared state
//!
//! Holds configuration and shared resources for the HTTP server.

use crate::config::Config;
use crate::error::Result;
use crate::geo::{get_geocoder, Geocoder};
use crate::store::clean::CleanDatabase;
use crate::store::Store;
use std::sync::Arc;
use std::time::Instant;

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration
    pub config: Config,

    /// Database files the API reads from
    pub store: Store,

    /// Geocoder for address origins and origin labels
    pub geocoder: Arc<dyn Geocoder>,

    started: Instant,
}

impl AppState {
    /// Create application state from the configuration
    pub fn new(config: Config) -> Result<Self> {
        let store = Store::open(&config)?;
        let geocoder = Arc::new(get_geocoder(&config)?);
        Ok(Self::with_parts(config, store, geocoder))
    }

    /// Create application state from explicit collaborators
    pub fn with_parts(config: Config, store: Store, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            config,
            store,
            geocoder,
            started: Instant::now(),
        }
    }

    /// Read the clean database on a blocking thread
    ///
    /// Every request sees the file as it is now, so a crawl finishing while
    /// the server runs shows up without a restart.
    pub async fn clean_database(&self) -> Result<CleanDatabase> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.load_clean())
            .await
            .map_err(|e| crate::error::Error::Server(format!("Database task failed: {}", e)))?
    }

    /// Seconds since the state was created
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
