//! coin-atlas: Elongated-coin machine locator
//!
//! A library and CLI tool that crawls a forum of elongated-coin machine
//! locations, repairs the coordinates people type into their posts, and
//! answers proximity queries.
//!
//! ## Features
//!
//! - Incremental forum crawl with per-category cool-down and checkpoints
//! - Coordinate parser for degrees/minutes/seconds, decimal and mixed notations
//! - Geocoding fallback on the topic title when a post has no usable coordinates
//! - Nearest-N and within-radius search on the WGS84 ellipsoid
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```rust
//! use coin_atlas::coord::parse::find_gps;
//!
//! let point = find_gps("N 50° 12.345' E 8° 30.678'").unwrap();
//! assert!((point.lat - 50.20575).abs() < 1e-6);
//! assert!((point.lng - 8.5113).abs() < 1e-6);
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod crawl;
pub mod error;
pub mod format;
pub mod forum;
pub mod geo;
pub mod net;
pub mod search;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use coord::Point;
pub use error::{Error, Result};
pub use search::{Origin, SearchHit};
pub use store::clean::{CleanDatabase, ResolvedLocation};
pub use store::{RawDatabase, Store};
