//! Cache statistics, inspection and cleanup
//!
//! Walks `{root}/{country}/{city}/map_data_{radius}m` directories, reports a
//! verdict and disk usage per entry, and removes leftovers of interrupted
//! writes.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::errors::{CacheError, CacheResult};

use super::path::{parse_entry_dir_name, CacheKey, EntryPaths};
use super::verification::{CacheValidator, CacheVerdict};

/// One entry directory found on disk
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    pub key: CacheKey,
    pub dir: PathBuf,
    pub file_count: usize,
    pub size_bytes: u64,
    /// Staged metadata files with their age
    pub staged: Vec<(PathBuf, Duration)>,
    /// Time since the directory or any file in it was last modified
    pub last_modified_age: Duration,
}

/// A scanned entry together with its validation verdict
#[derive(Debug, Clone)]
pub struct EntrySummary {
    pub entry: ScannedEntry,
    pub verdict: CacheVerdict,
}

impl EntrySummary {
    pub fn is_valid(&self) -> bool {
        self.verdict.is_hit()
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Cache root directory
    pub cache_root: PathBuf,
    /// Entry directories found
    pub entries: usize,
    /// Entries that validate as hits
    pub valid_entries: usize,
    /// Files across all entries
    pub total_files: usize,
    /// Total size of cached files in bytes
    pub total_cache_size: u64,
    /// Staged metadata files left behind
    pub staged_files: usize,
}

impl CacheStats {
    pub fn from_summaries(cache_root: PathBuf, summaries: &[EntrySummary]) -> Self {
        Self {
            cache_root,
            entries: summaries.len(),
            valid_entries: summaries.iter().filter(|s| s.is_valid()).count(),
            total_files: summaries.iter().map(|s| s.entry.file_count).sum(),
            total_cache_size: summaries.iter().map(|s| s.entry.size_bytes).sum(),
            staged_files: summaries.iter().map(|s| s.entry.staged.len()).sum(),
        }
    }

    pub fn invalid_entries(&self) -> usize {
        self.entries - self.valid_entries
    }

    /// Format cache size in human-readable format
    pub fn format_cache_size(&self) -> String {
        format_bytes(self.total_cache_size)
    }
}

/// Result of a cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Directory scanner for cache entries
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Find every entry directory under the cache root
    pub async fn scan_entries(cache_root: &Path) -> Vec<ScannedEntry> {
        // Directory walking is blocking I/O
        let cache_root = cache_root.to_path_buf();

        tokio::task::spawn_blocking(move || Self::scan_entries_blocking(&cache_root))
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to scan cache directory: {}", e);
                Vec::new()
            })
    }

    fn scan_entries_blocking(cache_root: &Path) -> Vec<ScannedEntry> {
        let mut entries = Vec::new();

        for country_dir in Self::subdirectories(cache_root) {
            for city_dir in Self::subdirectories(&country_dir) {
                for entry_dir in Self::subdirectories(&city_dir) {
                    let Some(radius_m) = entry_dir
                        .file_name()
                        .and_then(|name| name.to_str())
                        .and_then(parse_entry_dir_name)
                    else {
                        continue;
                    };

                    let key = CacheKey {
                        country_slug: Self::dir_name(&country_dir),
                        city_slug: Self::dir_name(&city_dir),
                        radius_m,
                    };
                    entries.push(Self::scan_entry(key, entry_dir));
                }
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    fn scan_entry(key: CacheKey, dir: PathBuf) -> ScannedEntry {
        let mut file_count = 0;
        let mut size_bytes = 0u64;
        let mut staged = Vec::new();
        let now = SystemTime::now();
        let age_of = |modified: std::io::Result<SystemTime>| {
            modified
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or(Duration::ZERO)
        };
        let mut last_modified_age = std::fs::metadata(&dir)
            .map(|metadata| age_of(metadata.modified()))
            .unwrap_or(Duration::ZERO);

        if let Ok(read_dir) = std::fs::read_dir(&dir) {
            for item in read_dir.flatten() {
                let Ok(metadata) = item.metadata() else {
                    continue;
                };
                if !metadata.is_file() {
                    continue;
                }
                file_count += 1;
                size_bytes += metadata.len();

                let age = age_of(metadata.modified());
                last_modified_age = last_modified_age.min(age);

                let name = item.file_name();
                if EntryPaths::is_staged_metadata(&name.to_string_lossy()) {
                    staged.push((item.path(), age));
                }
            }
        }

        ScannedEntry {
            key,
            dir,
            file_count,
            size_bytes,
            staged,
            last_modified_age,
        }
    }

    fn subdirectories(dir: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = match std::fs::read_dir(dir) {
            Ok(read_dir) => read_dir
                .flatten()
                .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
                .map(|entry| entry.path())
                .collect(),
            Err(_) => Vec::new(),
        };
        dirs.sort();
        dirs
    }

    fn dir_name(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Reports on and cleans up a cache tree
#[derive(Debug, Clone)]
pub struct CacheInspector {
    cache_root: PathBuf,
}

impl CacheInspector {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Scan and validate every entry
    pub async fn inspect(&self) -> Vec<EntrySummary> {
        let mut summaries = Vec::new();
        for entry in DirectoryScanner::scan_entries(&self.cache_root).await {
            let verdict = CacheValidator::validate(&entry.dir).await;
            summaries.push(EntrySummary { entry, verdict });
        }
        summaries
    }

    pub async fn stats(&self) -> CacheStats {
        let summaries = self.inspect().await;
        CacheStats::from_summaries(self.cache_root.clone(), &summaries)
    }

    /// Remove staged metadata files at least `min_age` old
    ///
    /// Younger files may belong to a write still in progress and are skipped.
    pub async fn clean_orphans(&self, min_age: Duration) -> CacheResult<CleanupReport> {
        let mut report = CleanupReport::default();

        for entry in DirectoryScanner::scan_entries(&self.cache_root).await {
            for (path, age) in entry.staged {
                if age < min_age {
                    debug!("Keeping recent staged file {}", path.display());
                    report.skipped.push(path);
                    continue;
                }
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        info!("Removed orphaned {}", path.display());
                        report.removed.push(path);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(source) => return Err(CacheError::RemoveFailed { path, source }),
                }
            }
        }

        Ok(report)
    }

    /// Remove entry directories that fail validation
    ///
    /// Entries modified more recently than `min_age` may still be filled by
    /// a writer (data files land before any metadata is staged) and are
    /// skipped.
    pub async fn clean_invalid(&self, min_age: Duration) -> CacheResult<CleanupReport> {
        let mut report = CleanupReport::default();

        for summary in self.inspect().await {
            if summary.is_valid() {
                continue;
            }
            let dir = summary.entry.dir;
            if summary.entry.last_modified_age < min_age {
                debug!("Keeping {} with a write in progress", dir.display());
                report.skipped.push(dir);
                continue;
            }

            fs::remove_dir_all(&dir)
                .await
                .map_err(|source| CacheError::RemoveFailed {
                    path: dir.clone(),
                    source,
                })?;
            info!("Removed invalid entry {}", summary.entry.key);
            report.removed.push(dir);
        }

        Ok(report)
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::files;
    use serde_json::json;
    use tempfile::TempDir;

    async fn write_valid_entry(root: &Path, country: &str, city: &str, radius_m: u32) -> PathBuf {
        let key = CacheKey::new(country, city, radius_m).unwrap();
        let dir = key.directory(root);
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(files::GRAPH_FILE), b"{}").await.unwrap();
        let metadata = json!({
            "city": city,
            "country": country,
            "city_slug": key.city_slug,
            "country_slug": key.country_slug,
            "radius_m": radius_m,
            "lat": 1.0,
            "lon": 2.0,
            "downloaded_at": "2026-01-05T10:00:00Z",
            "source_version": "citymap_fetcher/0.1.0",
            "water_available": false,
            "parks_available": false
        });
        fs::write(
            dir.join(files::METADATA_FILE),
            serde_json::to_vec(&metadata).unwrap(),
        )
        .await
        .unwrap();
        dir
    }

    async fn write_interrupted_entry(root: &Path) -> PathBuf {
        let key = CacheKey::new("Japan", "Tokyo", 5_000).unwrap();
        let dir = key.directory(root);
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(files::GRAPH_FILE), b"{}").await.unwrap();
        fs::write(dir.join("metadata.json.123-abcd.tmp"), b"{}")
            .await
            .unwrap();
        dir
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024_u64.pow(4)), "1.00 TB");
    }

    #[tokio::test]
    async fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let entries = DirectoryScanner::scan_entries(temp_dir.path()).await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_scan_ignores_unrelated_directories() {
        let temp_dir = TempDir::new().unwrap();
        write_valid_entry(temp_dir.path(), "France", "Paris", 10_000).await;
        fs::create_dir_all(temp_dir.path().join("france/paris/posters"))
            .await
            .unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"x")
            .await
            .unwrap();

        let entries = DirectoryScanner::scan_entries(temp_dir.path()).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, CacheKey::new("France", "Paris", 10_000).unwrap());
        assert_eq!(entries[0].file_count, 2);
        assert!(entries[0].size_bytes > 0);
    }

    #[tokio::test]
    async fn test_stats_count_valid_and_invalid() {
        let temp_dir = TempDir::new().unwrap();
        write_valid_entry(temp_dir.path(), "France", "Paris", 10_000).await;
        write_valid_entry(temp_dir.path(), "France", "Paris", 20_000).await;
        write_interrupted_entry(temp_dir.path()).await;

        let stats = CacheInspector::new(temp_dir.path()).stats().await;
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.valid_entries, 2);
        assert_eq!(stats.invalid_entries(), 1);
        assert_eq!(stats.staged_files, 1);
        assert_eq!(stats.total_files, 6);
    }

    #[tokio::test]
    async fn test_clean_orphans_respects_min_age() {
        let temp_dir = TempDir::new().unwrap();
        let dir = write_interrupted_entry(temp_dir.path()).await;
        let inspector = CacheInspector::new(temp_dir.path());

        let report = inspector
            .clean_orphans(Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(report.skipped.len(), 1);

        let report = inspector.clean_orphans(Duration::ZERO).await.unwrap();
        assert_eq!(report.removed.len(), 1);
        assert!(!dir.join("metadata.json.123-abcd.tmp").exists());
        assert!(dir.join(files::GRAPH_FILE).exists());
    }

    #[tokio::test]
    async fn test_clean_invalid_keeps_valid_entries() {
        let temp_dir = TempDir::new().unwrap();
        let valid = write_valid_entry(temp_dir.path(), "France", "Paris", 10_000).await;
        let invalid = write_interrupted_entry(temp_dir.path()).await;
        let inspector = CacheInspector::new(temp_dir.path());

        // Freshly written files mark the entry as in-flight
        let report = inspector
            .clean_invalid(Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(report.removed.is_empty());
        assert!(invalid.exists());

        let report = inspector.clean_invalid(Duration::ZERO).await.unwrap();
        assert_eq!(report.removed, vec![invalid.clone()]);
        assert!(!invalid.exists());
        assert!(valid.exists());
    }

    #[tokio::test]
    async fn test_clean_invalid_spares_entry_before_metadata_is_staged() {
        use crate::app::cache::{CacheConfig, CacheManager};
        use crate::app::graph::StreetNetworkGraph;
        use crate::app::models::{Coordinates, MapDataset, MapRequest};

        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::new(CacheConfig::with_cache_root(temp_dir.path().to_path_buf()))
            .await
            .unwrap();
        let request = MapRequest::new("Paris", "France", 10_000);
        let key = request.key().unwrap();
        let mut graph = StreetNetworkGraph::new(true);
        graph.add_node(1, 48.85, 2.35);
        graph.add_node(2, 48.86, 2.35);
        graph.add_edge(1, 2, None);
        let dataset = MapDataset {
            graph,
            water: None,
            parks: None,
            point: Coordinates::new(48.85, 2.35),
        };

        // Data files are on disk, metadata not yet staged
        let metadata = cache
            .write_data_files(&key, &request, &dataset)
            .await
            .unwrap();

        let inspector = CacheInspector::new(temp_dir.path());
        let report = inspector
            .clean_invalid(Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(report.skipped, vec![cache.entry_dir(&key)]);

        // The writer can still finish
        let staged = cache.stage_metadata(&key, &metadata).await.unwrap();
        staged.commit().await.unwrap();
        assert!(cache.validate(&key).await.is_hit());
    }
}
