//! Default configuration values
//!
//! Named constants for all tunable parameters

use crate::constants::{api, forum};

/// Forum index page listing the area sub-forums
pub const DEFAULT_INDEX_URL: &str = api::FORUM_INDEX_URL;

/// Base URL for relative forum links
pub const DEFAULT_BASE_URL: &str = api::FORUM_BASE_URL;

/// Minutes a visited category is left alone before it is crawled again
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 60;

/// Persist the raw database after this many newly processed entries
pub const DEFAULT_CHECKPOINT_EVERY: usize = 10;

/// Topics per forum listing page (the `start=` step)
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// User-Agent sent to the forum and the geocoder
pub const DEFAULT_USER_AGENT: &str = "coin-atlas/0.1.0";

/// Minimum spacing between two requests to the same service
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1000;

/// HTTP request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retries after a throttled (429) response before giving up
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Geocoding service base URL
pub const DEFAULT_GEOCODER_URL: &str = api::NOMINATIM_URL;

/// Default number of results for nearest-N queries
pub const DEFAULT_COUNT: usize = 5;

/// Default radius for within-radius queries in kilometers
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Number of hits listed in the text summary
pub const DEFAULT_SUMMARY_LIMIT: usize = 15;

/// Default output format
pub const DEFAULT_FORMAT: &str = "text";

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7979;

/// Default URL provider
pub const DEFAULT_URL_PROVIDER: &str = "google";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "coin-atlas";

/// Sub-forum title prefix for location areas
pub const DEFAULT_AREA_PREFIX: &str = forum::AREA_PREFIX;

/// Name of the limited-availability category
pub const DEFAULT_LIMITED_CATEGORY: &str = forum::LIMITED_CATEGORY;
