//! Application constants for City Map Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Overrides the cache root directory
    pub const CACHE_DIR: &str = "CITYMAP_CACHE_DIR";

    /// Overrides the themes directory
    pub const THEMES_DIR: &str = "CITYMAP_THEMES_DIR";

    /// Overrides the Nominatim endpoint
    pub const NOMINATIM_URL: &str = "CITYMAP_NOMINATIM_URL";

    /// Overrides the Overpass endpoint
    pub const OVERPASS_URL: &str = "CITYMAP_OVERPASS_URL";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests (required by the Nominatim usage policy)
    pub const USER_AGENT: &str = concat!(
        "citymap-fetcher/",
        env!("CARGO_PKG_VERSION"),
        " (city map poster generator)"
    );

    /// Default HTTP request timeout. Overpass queries for large radii are slow.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 4;
}

/// Remote service endpoints
pub mod endpoints {
    /// Public Nominatim search endpoint
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

    /// Public Overpass interpreter endpoint
    pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Nominatim allows at most one request per second
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 1;

    /// Maximum retry attempts for failed requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
}

/// On-disk cache layout
pub mod files {
    /// Street network graph file
    pub const GRAPH_FILE: &str = "graph.json";

    /// Water features file (optional)
    pub const WATER_FILE: &str = "water.geojson";

    /// Park features file (optional)
    pub const PARKS_FILE: &str = "parks.geojson";

    /// Metadata file, committed last
    pub const METADATA_FILE: &str = "metadata.json";

    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Prefix of each cache entry directory name (`map_data_<radius>m`)
    pub const ENTRY_DIR_PREFIX: &str = "map_data_";

    /// Separator substituted for whitespace and path-hostile characters in slugs
    pub const SLUG_SEPARATOR: char = '_';
}

/// Fetch orchestration defaults
pub mod fetcher {
    use super::Duration;

    /// Geocoding timeout
    pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(30);

    /// Street network download timeout
    pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(300);

    /// Water/parks download timeout
    pub const FEATURE_TIMEOUT: Duration = Duration::from_secs(180);

    /// Default map radius in meters
    pub const DEFAULT_RADIUS_M: u32 = 29_000;
}

/// Theme defaults
pub mod themes {
    /// Theme used when none is requested or the requested file is missing
    pub const DEFAULT_THEME: &str = "feature_based";

    /// Default directory searched for `<name>.json` theme files
    pub const DEFAULT_THEMES_DIR: &str = "themes";
}

/// Version recorded in cache metadata
pub const SOURCE_VERSION: &str = concat!("citymap_fetcher/", env!("CARGO_PKG_VERSION"));

// Re-export commonly used constants for convenience
pub use files::{GRAPH_FILE, METADATA_FILE, PARKS_FILE, TEMP_FILE_SUFFIX, WATER_FILE};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
