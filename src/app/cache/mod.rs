//! Map data cache with atomic commits and per-key reservations
//!
//! Each `(country, city, radius)` triple owns one entry directory holding a
//! street network graph, optional water and park layers and a
//! `metadata.json` commit record. An entry counts as present only when its
//! metadata is complete and consistent with the files beside it.
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`path`] - Slugs, cache keys and entry layout
//! - [`metadata`] - The `metadata.json` record
//! - [`verification`] - Entry validation producing a hit/miss verdict
//! - [`manager`] - Load and atomic write paths
//! - [`reservation`] - In-process per-key locking
//! - [`stats`] - Inspection and cleanup of the cache tree
//!
//! # Examples
//!
//! ```rust,no_run
//! use citymap_fetcher::app::cache::{CacheConfig, CacheManager, CacheVerdict};
//! use citymap_fetcher::app::models::MapRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::new(CacheConfig::default()).await?;
//! let request = MapRequest::new("Paris", "France", 10_000);
//! let key = request.key()?;
//!
//! match cache.validate(&key).await {
//!     CacheVerdict::Hit(metadata) => {
//!         let (dataset, _) = cache.load(&key).await?;
//!         println!("{} edges from {}", dataset.graph.edge_count(), metadata.downloaded_at);
//!     }
//!     CacheVerdict::Miss(reason) => println!("Need to fetch: {}", reason),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod metadata;
pub mod path;
pub mod reservation;
pub mod stats;
pub mod verification;

// Re-export main public API
pub use config::CacheConfig;
pub use manager::{CacheManager, StagedMetadata};
pub use metadata::{CacheMetadata, REQUIRED_KEYS};
pub use path::{slugify, CacheKey, EntryPaths};
pub use reservation::{KeyReservation, KeyReservations, ReservationStatus};
pub use stats::{format_bytes, CacheInspector, CacheStats, CleanupReport, EntrySummary};
pub use verification::{CacheValidator, CacheVerdict, MissReason};
