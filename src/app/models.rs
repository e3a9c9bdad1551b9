//! Data models for City Map Fetcher
//!
//! Coordinates, feature collections (water, parks), OSM tag filters and the
//! assembled [`MapDataset`] handed back to callers on both cache hits and
//! misses.

use std::collections::BTreeMap;
use std::fmt;

use geojson::{Feature, FeatureCollection, Value};
use serde::{Deserialize, Serialize};

use crate::app::cache::CacheKey;
use crate::app::graph::StreetNetworkGraph;
use crate::errors::ConfigResult;

/// A WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Bounding box `(south, west, north, east)` extending `radius_m` in every direction
    pub fn bbox(&self, radius_m: u32) -> (f64, f64, f64, f64) {
        const METERS_PER_DEGREE: f64 = 111_320.0;
        let d_lat = f64::from(radius_m) / METERS_PER_DEGREE;
        let cos_lat = self.lat.to_radians().cos().abs().max(1e-6);
        let d_lon = f64::from(radius_m) / (METERS_PER_DEGREE * cos_lat);
        (
            (self.lat - d_lat).max(-90.0),
            self.lon - d_lon,
            (self.lat + d_lat).min(90.0),
            self.lon + d_lon,
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Geometry kind of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    Collection,
    /// Feature without geometry
    Empty,
}

impl GeometryKind {
    fn of(feature: &Feature) -> Self {
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(_)) => Self::Point,
            Some(Value::MultiPoint(_)) => Self::MultiPoint,
            Some(Value::LineString(_)) => Self::LineString,
            Some(Value::MultiLineString(_)) => Self::MultiLineString,
            Some(Value::Polygon(_)) => Self::Polygon,
            Some(Value::MultiPolygon(_)) => Self::MultiPolygon,
            Some(Value::GeometryCollection(_)) => Self::Collection,
            None => Self::Empty,
        }
    }

    /// Whether features of this kind are drawn as filled areas
    pub fn is_areal(&self) -> bool {
        matches!(self, Self::Polygon | Self::MultiPolygon)
    }
}

/// A collection of geographic features with OSM tags as properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryCollection(FeatureCollection);

impl GeometryCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn features(&self) -> &[Feature] {
        &self.0.features
    }

    pub fn len(&self) -> usize {
        self.0.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.features.is_empty()
    }

    /// Geometry kind of every feature, in order
    pub fn kinds(&self) -> Vec<GeometryKind> {
        self.0.features.iter().map(GeometryKind::of).collect()
    }

    /// A new collection holding only polygon and multipolygon features
    ///
    /// Points and lines (e.g. a spring node tagged `natural=water`) are dropped
    /// rather than rejected.
    pub fn polygons(&self) -> Self {
        Self::new(
            self.0
                .features
                .iter()
                .filter(|f| GeometryKind::of(f).is_areal())
                .cloned()
                .collect(),
        )
    }

    /// Feature count per geometry kind
    pub fn count_by_kind(&self) -> BTreeMap<GeometryKind, usize> {
        let mut counts = BTreeMap::new();
        for kind in self.kinds() {
            *counts.entry(kind).or_insert(0) += 1;
        }
        counts
    }
}

impl From<FeatureCollection> for GeometryCollection {
    fn from(collection: FeatureCollection) -> Self {
        Self(collection)
    }
}

/// OSM tag filter: a feature matches when any `(key, value)` pair matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pairs: Vec<(String, String)>,
}

impl TagFilter {
    pub fn new<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Water bodies: `natural=water` and `waterway=riverbank`
    pub fn water() -> Self {
        Self::new([("natural", "water"), ("waterway", "riverbank")])
    }

    /// Green spaces: `leisure=park` and `landuse=grass`
    pub fn parks() -> Self {
        Self::new([("leisure", "park"), ("landuse", "grass")])
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Whether a tag map satisfies this filter
    pub fn matches<'a>(&self, mut lookup: impl FnMut(&str) -> Option<&'a str>) -> bool {
        self.pairs
            .iter()
            .any(|(k, v)| lookup(k).map(|actual| actual == v).unwrap_or(false))
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", rendered.join(" | "))
    }
}

/// What a caller asks for: a place and a radius
///
/// Display options (theme, road filtering, poster size) are not part of the
/// request and never affect cache identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRequest {
    pub city: String,
    pub country: String,
    pub radius_m: u32,
}

impl MapRequest {
    pub fn new(city: impl Into<String>, country: impl Into<String>, radius_m: u32) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
            radius_m,
        }
    }

    /// Cache key for this request
    pub fn key(&self) -> ConfigResult<CacheKey> {
        CacheKey::new(&self.country, &self.city, self.radius_m)
    }
}

impl fmt::Display for MapRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} @ {}m", self.city, self.country, self.radius_m)
    }
}

/// Map data for one city and radius
#[derive(Debug, Clone, PartialEq)]
pub struct MapDataset {
    pub graph: StreetNetworkGraph,
    /// `None` when no water exists near the point or the provider failed
    pub water: Option<GeometryCollection>,
    /// `None` when no parks exist near the point or the provider failed
    pub parks: Option<GeometryCollection>,
    pub point: Coordinates,
}

impl MapDataset {
    pub fn water_available(&self) -> bool {
        self.water.as_ref().map(|w| !w.is_empty()).unwrap_or(false)
    }

    pub fn parks_available(&self) -> bool {
        self.parks.as_ref().map(|p| !p.is_empty()).unwrap_or(false)
    }
}
