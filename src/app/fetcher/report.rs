//! Fetch outcomes reported back to callers

use std::fmt;
use std::time::Duration;

use crate::app::cache::{CacheMetadata, MissReason};
use crate::app::models::{GeometryCollection, MapDataset};

/// Where the dataset came from
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// Loaded from a valid cache entry; no collaborator was called
    Hit,
    /// Fetched from the network and written to the cache
    Miss {
        /// `None` when the cache check was skipped by a forced refresh
        reason: Option<MissReason>,
    },
}

impl DataSource {
    pub fn is_hit(&self) -> bool {
        matches!(self, DataSource::Hit)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Hit => write!(f, "cache HIT"),
            DataSource::Miss { reason: Some(reason) } => write!(f, "cache MISS ({})", reason),
            DataSource::Miss { reason: None } => write!(f, "cache MISS (refresh forced)"),
        }
    }
}

/// Result of one optional layer (water or parks)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureOutcome {
    /// Features found
    Available { features: usize },
    /// Provider answered with nothing, or a cached entry records the layer as absent
    Empty,
    /// Provider failed or timed out; the layer is recorded as unavailable
    Failed { reason: String },
}

impl FeatureOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, FeatureOutcome::Available { .. })
    }

    /// Outcome of a layer loaded from cache
    pub(crate) fn from_cached(layer: Option<&GeometryCollection>) -> Self {
        match layer {
            Some(collection) if !collection.is_empty() => FeatureOutcome::Available {
                features: collection.len(),
            },
            _ => FeatureOutcome::Empty,
        }
    }
}

impl fmt::Display for FeatureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureOutcome::Available { features } => write!(f, "{} features", features),
            FeatureOutcome::Empty => write!(f, "none"),
            FeatureOutcome::Failed { reason } => write!(f, "unavailable ({})", reason),
        }
    }
}

/// Summary of one fetch
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub source: DataSource,
    pub water: FeatureOutcome,
    pub parks: FeatureOutcome,
    /// Metadata of the entry that was loaded or written
    pub metadata: CacheMetadata,
    pub elapsed: Duration,
}

/// Dataset plus how it was obtained
#[derive(Debug, Clone)]
pub struct FetchedMap {
    pub dataset: MapDataset,
    pub report: FetchReport,
}
