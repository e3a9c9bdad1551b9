//! Cache configuration types and defaults

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the map data cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for cache storage (OS-specific if None)
    pub cache_root: Option<PathBuf>,
    /// Serialize fetches of the same key within this process
    pub reserve_keys: bool,
    /// Staged metadata files younger than this are never treated as orphans
    pub orphan_min_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: None, // Will use OS-specific cache directory
            reserve_keys: true,
            orphan_min_age: Duration::from_secs(60 * 60),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom cache root
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache_root: Some(cache_root),
            ..Default::default()
        }
    }

    /// Enable or disable per-key reservations
    pub fn with_reserve_keys(mut self, enabled: bool) -> Self {
        self.reserve_keys = enabled;
        self
    }

    /// Set the minimum age before a staged metadata file counts as orphaned
    pub fn with_orphan_min_age(mut self, age: Duration) -> Self {
        self.orphan_min_age = age;
        self
    }
}
