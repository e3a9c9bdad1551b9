//! Core cache manager with atomic operations
//!
//! Owns the cache root and implements the load and write paths. A write puts
//! every data file in place first and commits the entry last by renaming a
//! staged `metadata.json` into place; until that rename the validator sees a
//! miss.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::app::graph::StreetNetworkGraph;
use crate::app::models::{GeometryCollection, MapDataset, MapRequest};
use crate::constants::files;
use crate::errors::{CacheError, CacheResult};

use super::config::CacheConfig;
use super::metadata::CacheMetadata;
use super::path::{CacheKey, EntryPaths};
use super::verification::{CacheValidator, CacheVerdict};

/// Main cache management system
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Configuration
    config: CacheConfig,
    /// Cache root directory
    cache_root: PathBuf,
}

impl CacheManager {
    /// Create a new cache manager
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if cache directory cannot be created or accessed
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        let cache_root = match &config.cache_root {
            Some(path) => path.clone(),
            None => Self::get_default_cache_dir()?,
        };

        Self::ensure_directory_exists(&cache_root).await?;

        info!(
            "Initialized cache manager with root: {}",
            cache_root.display()
        );

        Ok(Self { config, cache_root })
    }

    /// Get the cache root directory
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Default cache directory for the current OS
    ///
    /// - macOS: ~/Library/Caches/citymap-fetcher
    /// - Linux: ~/.cache/citymap-fetcher
    /// - Windows: %LOCALAPPDATA%/citymap-fetcher
    pub fn get_default_cache_dir() -> CacheResult<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| CacheError::DirectoryNotAccessible {
                path: PathBuf::from("system cache directory"),
            })?
            .join("citymap-fetcher");

        Ok(cache_dir)
    }

    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            error!("Failed to create cache directory {}: {}", path.display(), e);
            CacheError::DirectoryNotAccessible {
                path: path.to_path_buf(),
            }
        })
    }

    /// Entry directory for a key
    pub fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        key.directory(&self.cache_root)
    }

    pub fn entry_paths(&self, key: &CacheKey) -> EntryPaths {
        EntryPaths::new(self.entry_dir(key))
    }

    /// Validate the entry for a key; never fails
    pub async fn validate(&self, key: &CacheKey) -> CacheVerdict {
        CacheValidator::validate(&self.entry_dir(key)).await
    }

    /// Load a dataset from an entry that was just validated
    ///
    /// Optional layers are read only when their availability flag is set.
    /// No re-validation happens here: an entry replaced between validation
    /// and load may still fail to parse.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::LoadCorruption` if a file cannot be read or parsed
    pub async fn load(&self, key: &CacheKey) -> CacheResult<(MapDataset, CacheMetadata)> {
        let paths = self.entry_paths(key);

        let metadata: CacheMetadata = read_json(&paths.metadata).await?;
        let graph: StreetNetworkGraph = read_json(&paths.graph).await?;

        let water = if metadata.water_available {
            Some(read_json::<GeometryCollection>(&paths.water).await?)
        } else {
            None
        };
        let parks = if metadata.parks_available {
            Some(read_json::<GeometryCollection>(&paths.parks).await?)
        } else {
            None
        };

        debug!(
            "Loaded {} ({} nodes, {} edges)",
            key,
            graph.node_count(),
            graph.edge_count()
        );

        let dataset = MapDataset {
            graph,
            water,
            parks,
            point: metadata.point(),
        };
        Ok((dataset, metadata))
    }

    /// Persist a freshly fetched dataset as a complete cache entry
    ///
    /// Any existing `metadata.json` is removed before data files are touched,
    /// so a refresh interrupted halfway leaves a miss rather than a hit that
    /// mixes old and new files.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if any write or the final rename fails
    pub async fn save_atomic(
        &self,
        key: &CacheKey,
        request: &MapRequest,
        dataset: &MapDataset,
    ) -> CacheResult<CacheMetadata> {
        let paths = self.entry_paths(key);
        Self::ensure_directory_exists(&paths.dir).await?;

        remove_if_exists(&paths.metadata).await?;

        let metadata = self.write_data_files(key, request, dataset).await?;
        let staged = self.stage_metadata(key, &metadata).await?;
        staged.commit().await?;

        info!(
            "Cached {} (water: {}, parks: {})",
            key, metadata.water_available, metadata.parks_available
        );
        Ok(metadata)
    }

    /// Write graph, water and parks files to their final names
    ///
    /// Returns the metadata describing what was written. Layers that are
    /// absent or empty are marked unavailable and any stale file from an
    /// earlier entry is removed.
    pub async fn write_data_files(
        &self,
        key: &CacheKey,
        request: &MapRequest,
        dataset: &MapDataset,
    ) -> CacheResult<CacheMetadata> {
        let paths = self.entry_paths(key);
        Self::ensure_directory_exists(&paths.dir).await?;

        write_json(&paths.graph, "street network graph", &dataset.graph).await?;

        let water_available = dataset.water_available();
        match dataset.water.as_ref().filter(|_| water_available) {
            Some(water) => write_json(&paths.water, "water features", water).await?,
            None => remove_if_exists(&paths.water).await?,
        }

        let parks_available = dataset.parks_available();
        match dataset.parks.as_ref().filter(|_| parks_available) {
            Some(parks) => write_json(&paths.parks, "park features", parks).await?,
            None => remove_if_exists(&paths.parks).await?,
        }

        Ok(CacheMetadata::new(
            &request.city,
            &request.country,
            key,
            dataset.point,
            water_available,
            parks_available,
        ))
    }

    /// Write metadata to a uniquely named temporary file beside its final path
    pub async fn stage_metadata(
        &self,
        key: &CacheKey,
        metadata: &CacheMetadata,
    ) -> CacheResult<StagedMetadata> {
        let paths = self.entry_paths(key);
        let temp_path = paths.dir.join(format!(
            "{}.{}-{:08x}{}",
            files::METADATA_FILE,
            std::process::id(),
            fastrand::u32(..),
            files::TEMP_FILE_SUFFIX
        ));

        if let Err(e) = write_json(&temp_path, "cache metadata", metadata).await {
            error!("Failed to stage metadata: {}", e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
        debug!("Staged metadata at {}", temp_path.display());

        Ok(StagedMetadata {
            temp_path,
            final_path: paths.metadata,
            dir: paths.dir,
        })
    }
}

/// Metadata written to its temporary path but not yet committed
#[derive(Debug)]
#[must_use = "staged metadata must be committed or discarded"]
pub struct StagedMetadata {
    temp_path: PathBuf,
    final_path: PathBuf,
    dir: PathBuf,
}

impl StagedMetadata {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically move the metadata into place, committing the entry
    pub async fn commit(self) -> CacheResult<()> {
        if let Err(e) = fs::rename(&self.temp_path, &self.final_path).await {
            error!("Failed to rename staged metadata: {}", e);
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(CacheError::AtomicOperationFailed {
                temp_path: self.temp_path,
                final_path: self.final_path,
            });
        }

        // Persist the rename itself; not supported on every platform
        match fs::File::open(&self.dir).await {
            Ok(dir) => {
                if let Err(e) = dir.sync_all().await {
                    debug!("Directory sync skipped for {}: {}", self.dir.display(), e);
                }
            }
            Err(e) => debug!("Directory sync skipped for {}: {}", self.dir.display(), e),
        }

        debug!("Committed {}", self.final_path.display());
        Ok(())
    }

    /// Drop the staged file without committing
    pub async fn discard(self) -> CacheResult<()> {
        remove_if_exists(&self.temp_path).await
    }
}

async fn write_json<T: Serialize>(path: &Path, what: &str, value: &T) -> CacheResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|source| CacheError::Serialization {
        what: what.to_string(),
        source,
    })?;

    let write_failed = |source: std::io::Error| CacheError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).await.map_err(write_failed)?;
    file.write_all(&bytes).await.map_err(write_failed)?;
    file.sync_all().await.map_err(write_failed)?;

    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> CacheResult<T> {
    let raw = fs::read(path)
        .await
        .map_err(|e| CacheError::LoadCorruption {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    serde_json::from_slice(&raw).map_err(|e| CacheError::LoadCorruption {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

async fn remove_if_exists(path: &Path) -> CacheResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => {
            warn!("Failed to remove {}: {}", path.display(), source);
            Err(CacheError::RemoveFailed {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}
