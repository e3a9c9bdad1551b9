//! Overpass API adapter for street networks and tagged features
//!
//! Street networks are built from `highway` ways inside a bounding box;
//! features are requested with `out geom` so every way and relation member
//! carries its own coordinates.

use std::collections::HashMap;

use async_trait::async_trait;
use geojson::feature::Id;
use geojson::{Feature, Geometry, JsonObject, Value};
use serde::Deserialize;
use url::Url;

use crate::app::graph::{haversine_m, Edge, NodeId, RoadTag, StreetNetworkGraph};
use crate::app::models::{Coordinates, GeometryCollection, TagFilter};
use crate::errors::{FetchError, FetchResult, Result};

use super::config::ClientConfig;
use super::http::HttpHandler;
use super::providers::{FeatureProvider, StreetNetworkProvider};

/// Raw Overpass JSON response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Set when the server aborted the query (e.g. its own timeout)
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: NodeId,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Way {
        id: u64,
        #[serde(default)]
        nodes: Vec<NodeId>,
        #[serde(default)]
        geometry: Vec<LatLon>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Relation {
        id: u64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Vec<LatLon>,
}

/// Street network and feature provider backed by an Overpass endpoint
#[derive(Debug)]
pub struct OverpassClient {
    http_handler: HttpHandler,
    interpreter_url: Url,
    /// Server-side query timeout in seconds
    query_timeout_secs: u64,
}

impl OverpassClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;
        let interpreter_url = config.overpass_url()?;
        Ok(Self {
            http_handler,
            interpreter_url,
            query_timeout_secs: config.request_timeout.as_secs().max(1),
        })
    }

    async fn run(&self, query: &str) -> FetchResult<OverpassResponse> {
        tracing::debug!("Overpass query: {}", query);
        let response: OverpassResponse = self
            .http_handler
            .post_form_json(&self.interpreter_url, &[("data", query)])
            .await?;

        if let Some(remark) = &response.remark {
            if response.elements.is_empty() {
                return Err(FetchError::InvalidResponse {
                    provider: "overpass".to_string(),
                    reason: remark.clone(),
                });
            }
            tracing::warn!("Overpass remark: {}", remark);
        }
        Ok(response)
    }
}

#[async_trait]
impl StreetNetworkProvider for OverpassClient {
    async fn fetch_graph(
        &self,
        point: Coordinates,
        radius_m: u32,
    ) -> FetchResult<StreetNetworkGraph> {
        let query = graph_query(point, radius_m, self.query_timeout_secs);
        let response = self
            .run(&query)
            .await
            .map_err(|e| FetchError::StreetNetwork {
                reason: e.to_string(),
            })?;

        let graph = build_graph(&response.elements);
        if graph.edge_count() == 0 {
            return Err(FetchError::StreetNetwork {
                reason: format!("no roads found within {}m of {}", radius_m, point),
            });
        }
        tracing::info!(
            "Street network: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

#[async_trait]
impl FeatureProvider for OverpassClient {
    async fn fetch_features(
        &self,
        point: Coordinates,
        radius_m: u32,
        filter: &TagFilter,
    ) -> FetchResult<GeometryCollection> {
        let query = feature_query(point, radius_m, filter, self.query_timeout_secs);
        let response = self.run(&query).await.map_err(|e| FetchError::Features {
            layer: filter.to_string(),
            reason: e.to_string(),
        })?;

        let features = build_features(&response.elements, filter);
        tracing::debug!("{} features for {}", features.len(), filter);
        Ok(features)
    }
}

/// All `highway` ways in a ±radius bounding box, with their nodes
pub fn graph_query(point: Coordinates, radius_m: u32, timeout_secs: u64) -> String {
    let (south, west, north, east) = point.bbox(radius_m);
    format!(
        "[out:json][timeout:{}];(way[\"highway\"]({:.7},{:.7},{:.7},{:.7}););(._;>;);out body;",
        timeout_secs, south, west, north, east
    )
}

/// Nodes, ways and relations matching any filter pair within `radius_m`
pub fn feature_query(
    point: Coordinates,
    radius_m: u32,
    filter: &TagFilter,
    timeout_secs: u64,
) -> String {
    let clauses: String = filter
        .pairs()
        .iter()
        .map(|(key, value)| {
            format!(
                "nwr[\"{}\"=\"{}\"](around:{},{:.7},{:.7});",
                key, value, radius_m, point.lat, point.lon
            )
        })
        .collect();
    format!("[out:json][timeout:{}];({});out geom;", timeout_secs, clauses)
}

/// Direction(s) in which a way may be traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Travel {
    Forward,
    Reverse,
    Both,
}

fn travel(tags: &HashMap<String, String>) -> Travel {
    match tags.get("oneway").map(String::as_str) {
        Some("yes") | Some("true") | Some("1") => Travel::Forward,
        Some("-1") | Some("reverse") => Travel::Reverse,
        Some("no") | Some("false") | Some("0") => Travel::Both,
        _ if tags.get("highway").map(String::as_str) == Some("motorway") => Travel::Forward,
        _ => Travel::Both,
    }
}

/// Build a directed multigraph from Overpass nodes and `highway` ways
///
/// Each pair of consecutive way nodes becomes an edge; two-way roads get an
/// edge in each direction. Ways referencing unknown nodes skip those segments.
pub fn build_graph(elements: &[Element]) -> StreetNetworkGraph {
    let mut graph = StreetNetworkGraph::new(true);

    for element in elements {
        if let Element::Node { id, lat, lon, .. } = element {
            graph.add_node(*id, *lat, *lon);
        }
    }

    let mut next_key: HashMap<(NodeId, NodeId), u32> = HashMap::new();
    let mut push = |graph: &mut StreetNetworkGraph,
                    u: NodeId,
                    v: NodeId,
                    way_id: u64,
                    tags: &HashMap<String, String>| {
        let (Some(a), Some(b)) = (graph.node(u), graph.node(v)) else {
            return;
        };
        let length_m = haversine_m(a.lat, a.lon, b.lat, b.lon);
        let key = next_key.entry((u, v)).or_insert(0);
        graph.push_edge(Edge {
            u,
            v,
            key: *key,
            highway: tags.get("highway").map(|h| RoadTag::from(h.as_str())),
            name: tags.get("name").cloned(),
            length_m: Some(length_m),
            osm_way_id: Some(way_id),
        });
        *key += 1;
    };

    for element in elements {
        let Element::Way { id, nodes, tags, .. } = element else {
            continue;
        };
        if !tags.contains_key("highway") {
            continue;
        }
        let direction = travel(tags);
        for pair in nodes.windows(2) {
            let (u, v) = (pair[0], pair[1]);
            if u == v {
                continue;
            }
            if direction != Travel::Reverse {
                push(&mut graph, u, v, *id, tags);
            }
            if direction != Travel::Forward {
                push(&mut graph, v, u, *id, tags);
            }
        }
    }

    graph
}

/// Convert Overpass elements into GeoJSON features matching `filter`
///
/// Closed ways become polygons, open ways line strings and tagged nodes
/// points. Multipolygon relations become a multipolygon of their closed
/// outer rings.
pub fn build_features(elements: &[Element], filter: &TagFilter) -> GeometryCollection {
    let mut features = Vec::new();

    for element in elements {
        let (kind, id, tags, value) = match element {
            Element::Node { id, lat, lon, tags } => {
                ("node", id, tags, Some(Value::Point(vec![*lon, *lat])))
            }
            Element::Way { id, geometry, tags, .. } => ("way", id, tags, way_geometry(geometry)),
            Element::Relation { id, members, tags } => {
                ("relation", id, tags, relation_geometry(members, tags))
            }
        };

        if !filter.matches(|key| tags.get(key).map(String::as_str)) {
            continue;
        }
        let Some(value) = value else {
            continue;
        };

        let properties: JsonObject = tags
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(value)),
            id: Some(Id::String(format!("{}/{}", kind, id))),
            properties: Some(properties),
            foreign_members: None,
        });
    }

    GeometryCollection::new(features)
}

fn ring(points: &[LatLon]) -> Vec<Vec<f64>> {
    points.iter().map(|p| vec![p.lon, p.lat]).collect()
}

fn is_closed(points: &[LatLon]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => {
            points.len() >= 4 && first.lat == last.lat && first.lon == last.lon
        }
        _ => false,
    }
}

fn way_geometry(points: &[LatLon]) -> Option<Value> {
    if is_closed(points) {
        Some(Value::Polygon(vec![ring(points)]))
    } else if points.len() >= 2 {
        Some(Value::LineString(ring(points)))
    } else {
        None
    }
}

fn relation_geometry(members: &[Member], tags: &HashMap<String, String>) -> Option<Value> {
    if tags.get("type").map(String::as_str) != Some("multipolygon") {
        return None;
    }
    // TODO: stitch outer rings that are split across several member ways
    let polygons: Vec<Vec<Vec<Vec<f64>>>> = members
        .iter()
        .filter(|m| m.kind == "way" && m.role == "outer" && is_closed(&m.geometry))
        .map(|m| vec![ring(&m.geometry)])
        .collect();
    (!polygons.is_empty()).then_some(Value::MultiPolygon(polygons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::GeometryKind;

    const GRAPH_RESPONSE: &str = r#"{
        "elements": [
            {"type": "node", "id": 1, "lat": 48.8566, "lon": 2.3522},
            {"type": "node", "id": 2, "lat": 48.8570, "lon": 2.3530},
            {"type": "node", "id": 3, "lat": 48.8575, "lon": 2.3540},
            {"type": "way", "id": 100, "nodes": [1, 2, 3],
             "tags": {"highway": "residential", "name": "Rue Example"}},
            {"type": "way", "id": 101, "nodes": [3, 1],
             "tags": {"highway": "primary", "oneway": "yes"}},
            {"type": "way", "id": 102, "nodes": [1, 3],
             "tags": {"highway": "motorway"}},
            {"type": "way", "id": 103, "nodes": [2, 99],
             "tags": {"highway": "service"}}
        ]
    }"#;

    const FEATURE_RESPONSE: &str = r#"{
        "elements": [
            {"type": "node", "id": 5, "lat": 48.85, "lon": 2.34,
             "tags": {"natural": "water"}},
            {"type": "way", "id": 200, "tags": {"natural": "water"},
             "geometry": [{"lat": 48.0, "lon": 2.0}, {"lat": 48.0, "lon": 2.1},
                          {"lat": 48.1, "lon": 2.1}, {"lat": 48.0, "lon": 2.0}]},
            {"type": "way", "id": 201, "tags": {"highway": "footway"},
             "geometry": [{"lat": 48.0, "lon": 2.0}, {"lat": 48.2, "lon": 2.2}]},
            {"type": "relation", "id": 300,
             "tags": {"type": "multipolygon", "waterway": "riverbank"},
             "members": [
                {"type": "way", "ref": 1, "role": "outer",
                 "geometry": [{"lat": 1.0, "lon": 1.0}, {"lat": 1.0, "lon": 1.1},
                              {"lat": 1.1, "lon": 1.1}, {"lat": 1.0, "lon": 1.0}]},
                {"type": "way", "ref": 2, "role": "inner",
                 "geometry": [{"lat": 1.0, "lon": 1.0}, {"lat": 1.05, "lon": 1.05}]}
             ]}
        ]
    }"#;

    #[test]
    fn test_build_graph_directions() {
        let response: OverpassResponse = serde_json::from_str(GRAPH_RESPONSE).unwrap();
        let graph = build_graph(&response.elements);

        assert_eq!(graph.node_count(), 3);
        // residential: 2 segments both ways, primary oneway: 1, motorway: 1
        assert_eq!(graph.edge_count(), 6);

        let primary: Vec<&Edge> = graph
            .edges()
            .iter()
            .filter(|e| e.primary_tag() == "primary")
            .collect();
        assert_eq!(primary.len(), 1);
        assert_eq!((primary[0].u, primary[0].v), (3, 1));

        let motorway: Vec<&Edge> = graph
            .edges()
            .iter()
            .filter(|e| e.primary_tag() == "motorway")
            .collect();
        assert_eq!(motorway.len(), 1);
        assert_eq!(motorway[0].key, 0);
        assert!(graph.edges().iter().all(|e| e.primary_tag() != "service"));
    }

    #[test]
    fn test_motorway_tagged_two_way() {
        let json = r#"{
            "elements": [
                {"type": "node", "id": 1, "lat": 48.8566, "lon": 2.3522},
                {"type": "node", "id": 2, "lat": 48.8570, "lon": 2.3530},
                {"type": "way", "id": 100, "nodes": [1, 2],
                 "tags": {"highway": "motorway", "oneway": "no"}}
            ]
        }"#;
        let response: OverpassResponse = serde_json::from_str(json).unwrap();
        let graph = build_graph(&response.elements);

        let mut ends: Vec<(NodeId, NodeId)> =
            graph.edges().iter().map(|e| (e.u, e.v)).collect();
        ends.sort();
        assert_eq!(ends, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_build_graph_edge_attributes() {
        let response: OverpassResponse = serde_json::from_str(GRAPH_RESPONSE).unwrap();
        let graph = build_graph(&response.elements);
        let edge = &graph.edges()[0];
        assert_eq!((edge.u, edge.v), (1, 2));
        assert_eq!(edge.name.as_deref(), Some("Rue Example"));
        assert_eq!(edge.osm_way_id, Some(100));
        assert!(edge.length_m.unwrap() > 0.0);
    }

    #[test]
    fn test_build_features() {
        let response: OverpassResponse = serde_json::from_str(FEATURE_RESPONSE).unwrap();
        let water = build_features(&response.elements, &TagFilter::water());

        assert_eq!(
            water.kinds(),
            vec![
                GeometryKind::Point,
                GeometryKind::Polygon,
                GeometryKind::MultiPolygon
            ]
        );
        assert_eq!(water.polygons().len(), 2);
        assert_eq!(
            water.features()[1].id,
            Some(Id::String("way/200".to_string()))
        );
    }

    #[test]
    fn test_queries() {
        let paris = Coordinates::new(48.8566, 2.3522);
        let graph = graph_query(paris, 1_000, 180);
        assert!(graph.starts_with("[out:json][timeout:180];"));
        assert!(graph.contains("way[\"highway\"]("));

        let features = feature_query(paris, 1_000, &TagFilter::parks(), 60);
        assert!(features.contains("nwr[\"leisure\"=\"park\"](around:1000,48.8566000,2.3522000);"));
        assert!(features.contains("nwr[\"landuse\"=\"grass\"]"));
        assert!(features.ends_with("out geom;"));
    }

    #[test]
    fn test_remark_only_response_parses() {
        let response: OverpassResponse =
            serde_json::from_str(r#"{"elements": [], "remark": "runtime error: timeout"}"#)
                .unwrap();
        assert!(response.elements.is_empty());
        assert!(response.remark.is_some());
    }
}
