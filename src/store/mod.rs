//! Persisted location stores
//!
//! Two JSON files make up the data set:
//! - the raw database, keyed by category URL, written by the crawler
//! - the clean database, keyed by location ID, derived from the raw one
//!
//! Both live in the XDG data directory (~/.local/share/coin-atlas/) unless
//! `storage.data_dir` says otherwise. They are loaded per invocation and
//! passed around explicitly; nothing is cached between calls.

pub mod clean;

use crate::config::Config;
use crate::constants::db::{FIRST_CATEGORY_ID, FIRST_LOCATION_ID};
use crate::coord::Point;
use crate::error::{Error, Result};
use chrono::{Duration, NaiveDateTime};
use clean::CleanDatabase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Interest and visit state of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryState {
    /// Not yet classified
    Unknown { visited: Option<NaiveDateTime> },
    /// Holds location entries
    Interesting { visited: Option<NaiveDateTime> },
    /// Never crawled again
    NotInteresting,
}

/// Where a category stands for the next crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Unvisited,
    InterestingUnvisited,
    RecentlyVisited,
    Stale,
    NotInteresting,
}

impl CrawlPhase {
    pub fn should_crawl(self) -> bool {
        !matches!(self, CrawlPhase::RecentlyVisited | CrawlPhase::NotInteresting)
    }
}

impl CategoryState {
    pub fn visited(&self) -> Option<NaiveDateTime> {
        match self {
            CategoryState::Unknown { visited } | CategoryState::Interesting { visited } => *visited,
            CategoryState::NotInteresting => None,
        }
    }

    /// Project the state onto a crawl phase at `now`
    pub fn phase(&self, now: NaiveDateTime, cooldown: Duration) -> CrawlPhase {
        match (self, self.visited()) {
            (CategoryState::NotInteresting, _) => CrawlPhase::NotInteresting,
            (CategoryState::Unknown { .. }, None) => CrawlPhase::Unvisited,
            (CategoryState::Interesting { .. }, None) => CrawlPhase::InterestingUnvisited,
            (_, Some(at)) if now - at < cooldown => CrawlPhase::RecentlyVisited,
            (_, Some(_)) => CrawlPhase::Stale,
        }
    }
}

/// A forum category and the entries found in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CategoryWire", into = "CategoryWire")]
pub struct CategoryRecord {
    pub cat_id: u64,
    pub name: String,
    pub state: CategoryState,
    pub location_list: Vec<LocationRecord>,
}

impl CategoryRecord {
    pub fn new(cat_id: u64, name: impl Into<String>, state: CategoryState) -> Self {
        Self {
            cat_id,
            name: name.into(),
            state,
            location_list: Vec::new(),
        }
    }

    pub fn phase(&self, now: NaiveDateTime, cooldown: Duration) -> CrawlPhase {
        self.state.phase(now, cooldown)
    }

    /// Record a finished crawl of this category
    pub fn mark_visited(&mut self, at: NaiveDateTime, found_locations: bool) {
        self.state = match self.state {
            CategoryState::NotInteresting => CategoryState::NotInteresting,
            CategoryState::Interesting { .. } => CategoryState::Interesting { visited: Some(at) },
            CategoryState::Unknown { .. } if found_locations => {
                CategoryState::Interesting { visited: Some(at) }
            }
            CategoryState::Unknown { .. } => CategoryState::Unknown { visited: Some(at) },
        };
    }
}

/// On-disk shape: `visited` is `false` or a timestamp, `interesting` is tri-state
#[derive(Serialize, Deserialize)]
struct CategoryWire {
    #[serde(rename = "cat_ID")]
    cat_id: u64,
    #[serde(default)]
    name: String,
    #[serde(with = "visited_flag", default)]
    visited: Option<NaiveDateTime>,
    #[serde(default)]
    interesting: Option<bool>,
    #[serde(default)]
    location_list: Vec<LocationRecord>,
}

impl From<CategoryWire> for CategoryRecord {
    fn from(wire: CategoryWire) -> Self {
        let state = match wire.interesting {
            Some(false) => CategoryState::NotInteresting,
            Some(true) => CategoryState::Interesting { visited: wire.visited },
            None => CategoryState::Unknown { visited: wire.visited },
        };
        Self {
            cat_id: wire.cat_id,
            name: wire.name,
            state,
            location_list: wire.location_list,
        }
    }
}

impl From<CategoryRecord> for CategoryWire {
    fn from(record: CategoryRecord) -> Self {
        let interesting = match record.state {
            CategoryState::NotInteresting => Some(false),
            CategoryState::Interesting { .. } => Some(true),
            CategoryState::Unknown { .. } => None,
        };
        Self {
            cat_id: record.cat_id,
            name: record.name,
            visited: record.state.visited(),
            interesting,
            location_list: record.location_list,
        }
    }
}

/// One forum topic as scraped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "loc_ID", default)]
    pub loc_id: u64,
    pub name: String,
    pub url: String,
    #[serde(with = "timestamp")]
    pub updated: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub visited: NaiveDateTime,
    #[serde(default)]
    pub interesting: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<String>,
    /// Parsed from `gps_text`
    #[serde(with = "crate::coord::as_string", default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<Point>,
    #[serde(with = "crate::coord::as_string", default, skip_serializing_if = "Option::is_none")]
    pub full_name_gps: Option<Point>,
    #[serde(with = "crate::coord::as_string", default, skip_serializing_if = "Option::is_none")]
    pub partial_name_gps: Option<Point>,
    /// Set by hand, beats every other source
    #[serde(with = "crate::coord::as_string", default, skip_serializing_if = "Option::is_none")]
    pub corrected_gps: Option<Point>,
}

impl LocationRecord {
    /// A topic that turned out not to describe a location
    pub fn other(name: impl Into<String>, url: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            loc_id: 0,
            name: name.into(),
            url: url.into(),
            updated: now,
            visited: now,
            interesting: false,
            gps_text: None,
            location_description: None,
            entry_date: None,
            gps: None,
            full_name_gps: None,
            partial_name_gps: None,
            corrected_gps: None,
        }
    }

    /// A location entry with the fields taken from its first post
    pub fn location(
        name: impl Into<String>,
        url: impl Into<String>,
        now: NaiveDateTime,
        description: String,
        gps_text: Option<String>,
        entry_date: Option<String>,
    ) -> Self {
        Self {
            interesting: true,
            gps_text,
            location_description: Some(description),
            entry_date,
            ..Self::other(name, url, now)
        }
    }

    /// Whether any automatic coordinate source has been filled
    pub fn has_automatic_gps(&self) -> bool {
        self.gps.is_some() || self.full_name_gps.is_some() || self.partial_name_gps.is_some()
    }
}

/// The raw crawl database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDatabase {
    /// Next category ID to hand out
    #[serde(rename = "cat_ID", default = "first_category_id")]
    pub next_category_id: u64,
    /// Next location ID to hand out
    #[serde(rename = "loc_ID", default = "first_location_id")]
    pub next_location_id: u64,
    /// Categories by URL
    #[serde(flatten)]
    pub categories: BTreeMap<String, CategoryRecord>,
}

fn first_category_id() -> u64 {
    FIRST_CATEGORY_ID
}

fn first_location_id() -> u64 {
    FIRST_LOCATION_ID
}

impl Default for RawDatabase {
    fn default() -> Self {
        Self {
            next_category_id: FIRST_CATEGORY_ID,
            next_location_id: FIRST_LOCATION_ID,
            categories: BTreeMap::new(),
        }
    }
}

impl RawDatabase {
    pub fn allocate_category_id(&mut self) -> u64 {
        let id = self.next_category_id;
        self.next_category_id += 1;
        id
    }

    pub fn allocate_location_id(&mut self) -> u64 {
        let id = self.next_location_id;
        self.next_location_id += 1;
        id
    }

    /// All locations with the category they belong to
    pub fn locations(&self) -> impl Iterator<Item = (&CategoryRecord, &LocationRecord)> {
        self.categories
            .values()
            .flat_map(|cat| cat.location_list.iter().map(move |loc| (cat, loc)))
    }

    pub fn locations_mut(&mut self) -> impl Iterator<Item = &mut LocationRecord> {
        self.categories
            .values_mut()
            .flat_map(|cat| cat.location_list.iter_mut())
    }

    pub fn location_mut(&mut self, loc_id: u64) -> Option<&mut LocationRecord> {
        self.locations_mut().find(|loc| loc.loc_id == loc_id)
    }

    pub fn location_count(&self) -> usize {
        self.categories.values().map(|cat| cat.location_list.len()).sum()
    }
}

/// Handle on the two database files
#[derive(Debug, Clone)]
pub struct Store {
    raw_path: PathBuf,
    clean_path: PathBuf,
    limited_category: String,
}

impl Store {
    pub fn new(raw_path: impl Into<PathBuf>, clean_path: impl Into<PathBuf>) -> Self {
        Self {
            raw_path: raw_path.into(),
            clean_path: clean_path.into(),
            limited_category: crate::constants::forum::LIMITED_CATEGORY.to_string(),
        }
    }

    /// Store at the configured data directory
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(config.raw_database_path()?, config.clean_database_path()?)
            .with_limited_category(&config.forum.limited_category))
    }

    pub fn with_limited_category(mut self, name: &str) -> Self {
        self.limited_category = name.to_string();
        self
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn clean_path(&self) -> &Path {
        &self.clean_path
    }

    /// Load the raw database; a missing file is an empty database
    pub fn load(&self) -> Result<RawDatabase> {
        if !self.raw_path.exists() {
            debug!(path = %self.raw_path.display(), "no raw database yet");
            return Ok(RawDatabase::default());
        }
        let content = fs::read_to_string(&self.raw_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load the clean database, deriving it when the file is missing
    pub fn load_clean(&self) -> Result<CleanDatabase> {
        if !self.clean_path.exists() {
            return self.rebuild_clean();
        }
        let content = fs::read_to_string(&self.clean_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Regenerate the clean database from the raw one
    pub fn rebuild_clean(&self) -> Result<CleanDatabase> {
        let db = self.load()?;
        let clean = clean::project(&db, &self.limited_category);
        write_atomic(&self.clean_path, &serde_json::to_vec_pretty(&clean)?)?;
        info!(locations = clean.len(), "rebuilt clean database");
        Ok(clean)
    }

    /// Write the raw database and its clean projection
    ///
    /// Either both files are updated or both are put back to what they
    /// held before the call.
    pub fn save(&self, db: &RawDatabase) -> Result<()> {
        let raw_before = snapshot(&self.raw_path);
        let clean_before = snapshot(&self.clean_path);

        match self.write_both(db) {
            Ok(()) => {
                debug!(locations = db.location_count(), "saved databases");
                Ok(())
            }
            Err(e) => {
                restore(&self.raw_path, raw_before);
                restore(&self.clean_path, clean_before);
                warn!(error = %e, "save failed, previous databases restored");
                Err(Error::Persistence(format!("{} (rolled back)", e)))
            }
        }
    }

    fn write_both(&self, db: &RawDatabase) -> Result<()> {
        write_atomic(&self.raw_path, &serde_json::to_vec_pretty(db)?)?;
        let clean = clean::project(db, &self.limited_category);
        write_atomic(&self.clean_path, &serde_json::to_vec_pretty(&clean)?)
    }
}

fn snapshot(path: &Path) -> Option<Vec<u8>> {
    fs::read(path).ok()
}

fn restore(path: &Path, before: Option<Vec<u8>>) {
    let result = match before {
        Some(bytes) => write_atomic(path, &bytes),
        None if path.is_file() => fs::remove_file(path).map_err(Error::from),
        None => Ok(()),
    };
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "could not restore previous version");
    }
}

/// Write through a sibling temp file and rename over the target
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Current local time, the clock the stores are written in
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Timestamps as `YYYY-MM-DD HH:MM:SS.ffffff`, reading `T` separated ones too
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
    const READ_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    pub fn format(at: &NaiveDateTime) -> String {
        at.format(WRITE_FORMAT).to_string()
    }

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        READ_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
    }

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
    }

    /// Same format for optional values, `null` when absent
    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            at: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => serializer.serialize_some(&super::format(at)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) => super::parse(&s)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
                None => Ok(None),
            }
        }
    }
}

/// Category `visited`: `false` when never visited, a timestamp otherwise
mod visited_flag {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        At(String),
        Never(serde::de::IgnoredAny),
    }

    pub fn serialize<S: Serializer>(at: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match at {
            Some(at) => serializer.serialize_str(&super::timestamp::format(at)),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<Flag>::deserialize(deserializer)? {
            Some(Flag::At(s)) => super::timestamp::parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
            Some(Flag::Never(_)) | None => Ok(None),
        }
    }
}
