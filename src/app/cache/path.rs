//! Cache key derivation and entry layout
//!
//! A cache entry is identified by `(country, city, radius)` only and lives at
//! `{cache_root}/{country_slug}/{city_slug}/map_data_{radius}m`. Display
//! options such as the theme never reach this module.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::files;
use crate::errors::{ConfigError, ConfigResult};

/// Normalize a place name into a single, filesystem-safe path component
///
/// The name is trimmed and lowercased; every run of whitespace or
/// path-hostile characters becomes one `_`. Non-ASCII letters are kept, so
/// `"San José"` and `"San Jose"` stay distinct while `"New York"`,
/// `"new york"` and `" NEW   YORK "` all map to `new_york`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.trim().chars() {
        if ch.is_whitespace() || is_path_hostile(ch) {
            pending_separator = true;
            continue;
        }
        if pending_separator {
            slug.push(files::SLUG_SEPARATOR);
            pending_separator = false;
        }
        slug.extend(ch.to_lowercase());
    }

    // "." and ".." would escape the cache tree
    if slug.is_empty() || slug.chars().all(|c| c == '.') {
        return files::SLUG_SEPARATOR.to_string();
    }
    slug
}

fn is_path_hostile(ch: char) -> bool {
    matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || ch.is_control()
}

/// Identity of one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub country_slug: String,
    pub city_slug: String,
    pub radius_m: u32,
}

impl CacheKey {
    /// Derive a key from raw place names
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when `radius_m` is zero
    pub fn new(country: &str, city: &str, radius_m: u32) -> ConfigResult<Self> {
        if radius_m == 0 {
            return Err(ConfigError::InvalidValue {
                field: "radius".to_string(),
                value: radius_m.to_string(),
                reason: "Radius must be a positive number of meters".to_string(),
            });
        }
        Ok(Self {
            country_slug: slugify(country),
            city_slug: slugify(city),
            radius_m,
        })
    }

    /// Name of the entry directory, e.g. `map_data_10000m`
    pub fn dir_name(&self) -> String {
        format!("{}{}m", files::ENTRY_DIR_PREFIX, self.radius_m)
    }

    /// Absolute entry directory under `cache_root`
    pub fn directory(&self, cache_root: &Path) -> PathBuf {
        cache_root
            .join(&self.country_slug)
            .join(&self.city_slug)
            .join(self.dir_name())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} @ {}m",
            self.country_slug, self.city_slug, self.radius_m
        )
    }
}

/// Parse the radius out of an entry directory name (`map_data_<radius>m`)
pub fn parse_entry_dir_name(name: &str) -> Option<u32> {
    name.strip_prefix(files::ENTRY_DIR_PREFIX)?
        .strip_suffix('m')?
        .parse()
        .ok()
        .filter(|radius| *radius > 0)
}

/// File locations within one cache entry directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPaths {
    pub dir: PathBuf,
    pub graph: PathBuf,
    pub water: PathBuf,
    pub parks: PathBuf,
    pub metadata: PathBuf,
}

impl EntryPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            graph: dir.join(files::GRAPH_FILE),
            water: dir.join(files::WATER_FILE),
            parks: dir.join(files::PARKS_FILE),
            metadata: dir.join(files::METADATA_FILE),
            dir,
        }
    }

    /// Whether a file name is a staged (uncommitted) metadata file
    pub fn is_staged_metadata(file_name: &str) -> bool {
        file_name.starts_with(files::METADATA_FILE)
            && file_name.len() > files::METADATA_FILE.len()
            && file_name.ends_with(files::TEMP_FILE_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Paris"), "paris");
        assert_eq!(slugify("New York"), "new_york");
        assert_eq!(slugify("United Kingdom"), "united_kingdom");
    }

    #[test]
    fn test_slugify_collapses_case_and_spacing() {
        assert_eq!(slugify("new york"), slugify("New York"));
        assert_eq!(slugify("  NEW   York "), "new_york");
        assert_eq!(slugify("New\tYork"), "new_york");
    }

    #[test]
    fn test_slugify_keeps_accents_distinct() {
        assert_eq!(slugify("San José"), "san_josé");
        assert_ne!(slugify("San José"), slugify("San Jose"));
        assert_eq!(slugify("MÜNCHEN"), "münchen");
    }

    #[test]
    fn test_slugify_is_single_path_component() {
        assert_eq!(slugify("Washington, D.C."), "washington,_d.c.");
        assert_eq!(slugify("a/b\\c"), "a_b_c");
        assert_eq!(slugify(".."), "_");
        assert_eq!(slugify("   "), "_");
        assert!(!slugify("../../etc").contains('/'));
    }

    #[test]
    fn test_key_directory_layout() {
        let key = CacheKey::new("France", "Paris", 10_000).unwrap();
        let dir = key.directory(Path::new("/cache"));
        assert_eq!(dir, PathBuf::from("/cache/france/paris/map_data_10000m"));
        assert_eq!(key.to_string(), "france/paris @ 10000m");
    }

    #[test]
    fn test_key_derivation_is_idempotent() {
        let a = CacheKey::new("USA", "New York", 12_000).unwrap();
        let b = CacheKey::new("usa", "new  york", 12_000).unwrap();
        let c = CacheKey::new("USA", "New York", 12_000).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(
            a.directory(Path::new("/root")),
            b.directory(Path::new("/root"))
        );
        assert_ne!(a, CacheKey::new("USA", "New York", 12_001).unwrap());
    }

    #[test]
    fn test_zero_radius_rejected() {
        assert!(CacheKey::new("France", "Paris", 0).is_err());
    }

    #[test]
    fn test_parse_entry_dir_name() {
        assert_eq!(parse_entry_dir_name("map_data_29000m"), Some(29_000));
        assert_eq!(parse_entry_dir_name("map_data_0m"), None);
        assert_eq!(parse_entry_dir_name("map_data_abcm"), None);
        assert_eq!(parse_entry_dir_name("posters"), None);
    }

    #[test]
    fn test_entry_paths() {
        let paths = EntryPaths::new("/cache/france/paris/map_data_10000m");
        assert!(paths.graph.ends_with("graph.json"));
        assert!(paths.water.ends_with("water.geojson"));
        assert!(paths.parks.ends_with("parks.geojson"));
        assert!(paths.metadata.ends_with("metadata.json"));
    }

    #[test]
    fn test_is_staged_metadata() {
        assert!(EntryPaths::is_staged_metadata("metadata.json.4242-abc.tmp"));
        assert!(!EntryPaths::is_staged_metadata("metadata.json"));
        assert!(!EntryPaths::is_staged_metadata("graph.json.tmp"));
    }
}
