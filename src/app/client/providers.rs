//! Collaborator traits the fetcher depends on
//!
//! The fetcher only sees these traits; the HTTP adapters in this module's
//! siblings are one implementation, test doubles are another.

use async_trait::async_trait;

use crate::app::graph::StreetNetworkGraph;
use crate::app::models::{Coordinates, GeometryCollection, TagFilter};
use crate::errors::FetchResult;

/// Resolves a place name to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// # Errors
    ///
    /// Returns `FetchError::PlaceNotFound` when the place cannot be resolved
    async fn resolve(&self, city: &str, country: &str) -> FetchResult<Coordinates>;
}

/// Downloads the street network around a point
#[async_trait]
pub trait StreetNetworkProvider: Send + Sync {
    async fn fetch_graph(&self, point: Coordinates, radius_m: u32)
        -> FetchResult<StreetNetworkGraph>;
}

/// Downloads tagged features (water, parks) around a point
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    async fn fetch_features(
        &self,
        point: Coordinates,
        radius_m: u32,
        filter: &TagFilter,
    ) -> FetchResult<GeometryCollection>;
}
