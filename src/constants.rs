//! Centralized constants for the coin-atlas crate
//!
//! Values shared by several modules. Tunables that users may want to change
//! live in `config::defaults` instead.

/// External API endpoints
pub mod api {
    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// Forum index listing all area sub-forums
    pub const FORUM_INDEX_URL: &str = "http://www.elongated-coin.de/phpBB3/viewforum.php?f=126";

    /// Base URL that relative forum links (`./viewforum.php?...`) resolve against
    pub const FORUM_BASE_URL: &str = "http://www.elongated-coin.de/phpBB3/";

    /// Google Maps search link, the same link stored in the clean database
    pub const GOOGLE_MAPS_QUERY_URL: &str = "https://maps.google.com/?q=";
}

/// Forum markup markers
pub mod forum {
    /// Prefix of the sub-forum titles that hold location categories
    pub const AREA_PREFIX: &str = "Standorte in";

    /// Bold label that opens the location description of a post
    pub const DESCRIPTION_LABEL: &str = "Standort";

    /// Label whose presence marks a post as a location entry
    pub const ENTRY_MARKER: &str = "Standortbeschreibung";

    /// Bold label that opens the GPS section of a post
    pub const GPS_LABEL: &str = "GPS";

    /// Categories that never contain location entries
    pub const EXCLUDED_CATEGORIES: [&str; 2] = ["Informationen und Download", "Treffen und Forumcoins"];

    /// Category whose machines are only available for a limited time
    pub const LIMITED_CATEGORY: &str = "Zeitlich begrenzte Standorte";
}

/// Database counters
pub mod db {
    /// First category ID handed out in an empty database
    pub const FIRST_CATEGORY_ID: u64 = 0;

    /// First location ID handed out in an empty database
    pub const FIRST_LOCATION_ID: u64 = 1000;

    /// Raw crawl database file name
    pub const RAW_DATABASE_FILE: &str = "url_database.json";

    /// Clean (query) database file name
    pub const CLEAN_DATABASE_FILE: &str = "clean_database.json";
}
