//! Cache entry metadata
//!
//! `metadata.json` is the commit record of a cache entry: the validator only
//! trusts an entry whose metadata is present, complete and consistent with the
//! files beside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path::CacheKey;
use crate::app::models::Coordinates;
use crate::constants::SOURCE_VERSION;

/// Keys every committed metadata file must contain
pub const REQUIRED_KEYS: [&str; 11] = [
    "city",
    "country",
    "city_slug",
    "country_slug",
    "radius_m",
    "lat",
    "lon",
    "downloaded_at",
    "source_version",
    "water_available",
    "parks_available",
];

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub city: String,
    pub country: String,
    pub city_slug: String,
    pub country_slug: String,
    pub radius_m: u32,
    pub lat: f64,
    pub lon: f64,
    pub downloaded_at: DateTime<Utc>,
    pub source_version: String,
    pub water_available: bool,
    pub parks_available: bool,
}

impl CacheMetadata {
    /// Describe a freshly fetched dataset
    pub fn new(
        city: &str,
        country: &str,
        key: &CacheKey,
        point: Coordinates,
        water_available: bool,
        parks_available: bool,
    ) -> Self {
        Self {
            city: city.to_string(),
            country: country.to_string(),
            city_slug: key.city_slug.clone(),
            country_slug: key.country_slug.clone(),
            radius_m: key.radius_m,
            lat: point.lat,
            lon: point.lon,
            downloaded_at: Utc::now(),
            source_version: SOURCE_VERSION.to_string(),
            water_available,
            parks_available,
        }
    }

    pub fn point(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    /// Age of the entry relative to now
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.downloaded_at)
    }
}
