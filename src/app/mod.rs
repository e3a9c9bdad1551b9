//! Core application logic for City Map Fetcher
//!
//! This module contains the map data cache, the fetch orchestrator and its
//! external collaborators, the street network model and the road styling
//! pipeline.
//!
//! # Examples
//!
//! ```rust,no_run
//! use citymap_fetcher::app::{filter_roads, RenderPlan, Theme, TierSet};
//! # use citymap_fetcher::app::MapDataset;
//!
//! # fn example(dataset: MapDataset) {
//! // Major arteries only, drawn with the built-in theme
//! let dataset = MapDataset {
//!     graph: filter_roads(&dataset.graph, &TierSet::minor_roads()),
//!     ..dataset
//! };
//! let plan = RenderPlan::build(&dataset, &Theme::feature_based());
//! println!("{} styled edges", plan.edges.len());
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod fetcher;
pub mod graph;
pub mod models;
pub mod roads;
pub mod theme;

// Re-export main public API
pub use cache::{
    CacheConfig, CacheInspector, CacheKey, CacheManager, CacheMetadata, CacheStats, CacheVerdict,
    MissReason,
};
pub use client::{
    ClientConfig, FeatureProvider, Geocoder, NominatimGeocoder, OverpassClient,
    StreetNetworkProvider,
};
pub use fetcher::{
    DataSource, FeatureOutcome, FetchOptions, FetchReport, FetchedMap, FetcherConfig,
    MapDataFetcher,
};
pub use graph::{Edge, RoadTag, StreetNetworkGraph};
pub use models::{Coordinates, GeometryCollection, MapDataset, MapRequest, TagFilter};
pub use roads::{classify, classify_edge, filter_roads, RoadStyle, RoadTier, TierSet};
pub use theme::{RenderPlan, StyledEdge, Theme, ThemeLibrary};
