//! Prelude module for City Map Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use citymap_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use citymap_fetcher::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client_config = ClientConfig::default();
//!     let overpass = Arc::new(OverpassClient::new(&client_config)?);
//!     let fetcher = MapDataFetcher::new(
//!         CacheManager::new(CacheConfig::default()).await?,
//!         Arc::new(NominatimGeocoder::new(&client_config)?),
//!         overpass.clone(),
//!         overpass,
//!         FetcherConfig::default(),
//!     );
//!
//!     let request = MapRequest::new("Lisbon", "Portugal", 8_000);
//!     let fetched = fetcher.fetch(&request, FetchOptions::default()).await?;
//!     let plan = RenderPlan::build(&fetched.dataset, &Theme::feature_based());
//!     println!("{} roads to draw", plan.edges.len());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    // Cache
    CacheConfig,
    CacheManager,
    CacheStats,
    CacheVerdict,

    // Collaborators
    ClientConfig,
    FeatureProvider,
    Geocoder,
    NominatimGeocoder,
    OverpassClient,
    StreetNetworkProvider,

    // Orchestration
    DataSource,
    FeatureOutcome,
    FetchOptions,
    FetchedMap,
    FetcherConfig,
    MapDataFetcher,

    // Data types
    Coordinates,
    GeometryCollection,
    MapDataset,
    MapRequest,
    StreetNetworkGraph,

    // Road styling
    filter_roads,
    RenderPlan,
    RoadTier,
    Theme,
    TierSet,
};
