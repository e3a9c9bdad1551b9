//! Street network multigraph
//!
//! Intersections are nodes with a latitude/longitude; road segments are edges
//! keyed by `(u, v, key)` so parallel segments between the same two
//! intersections can coexist. Each edge carries the OSM `highway` tag, which
//! is either a single token or an ordered list of tokens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// OSM node identifier
pub type NodeId = u64;

/// Tag value used when an edge has no usable road-type tag
pub const UNCLASSIFIED: &str = "unclassified";

/// Road-type tag of an edge
///
/// OSM data occasionally merges ways whose `highway` values differ; those
/// edges carry every value in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoadTag {
    /// A single `highway` value
    Single(String),
    /// Several `highway` values, in source order
    List(Vec<String>),
}

impl RoadTag {
    /// The tag that decides styling: the value itself, or the first element of a list
    pub fn primary(&self) -> &str {
        match self {
            RoadTag::Single(tag) => tag,
            RoadTag::List(tags) => tags.first().map(String::as_str).unwrap_or(UNCLASSIFIED),
        }
    }

    /// All tag values in order
    pub fn values(&self) -> Vec<&str> {
        match self {
            RoadTag::Single(tag) => vec![tag.as_str()],
            RoadTag::List(tags) => tags.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for RoadTag {
    fn from(tag: &str) -> Self {
        RoadTag::Single(tag.to_string())
    }
}

impl From<Vec<&str>> for RoadTag {
    fn from(tags: Vec<&str>) -> Self {
        RoadTag::List(tags.into_iter().map(str::to_string).collect())
    }
}

/// An intersection or shape point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub lat: f64,
    pub lon: f64,
}

/// A directed road segment between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub u: NodeId,
    pub v: NodeId,
    /// Distinguishes parallel edges between the same `(u, v)` pair
    pub key: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highway: Option<RoadTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_way_id: Option<u64>,
}

impl Edge {
    /// Tag used for classification; untagged edges count as `unclassified`
    pub fn primary_tag(&self) -> &str {
        self.highway
            .as_ref()
            .map(RoadTag::primary)
            .unwrap_or(UNCLASSIFIED)
    }

    /// Every tag value on this edge; untagged edges yield `["unclassified"]`
    pub fn tag_values(&self) -> Vec<&str> {
        match &self.highway {
            Some(tag) => {
                let values = tag.values();
                if values.is_empty() {
                    vec![UNCLASSIFIED]
                } else {
                    values
                }
            }
            None => vec![UNCLASSIFIED],
        }
    }
}

/// Street network multigraph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreetNetworkGraph {
    /// Whether edges are one-directional; two-way roads then appear twice
    pub directed: bool,
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
}

impl StreetNetworkGraph {
    /// Create an empty graph
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            nodes: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    /// Insert or replace a node
    pub fn add_node(&mut self, id: NodeId, lat: f64, lon: f64) {
        self.nodes.insert(id, Node { lat, lon });
    }

    /// Append an edge between `u` and `v`, assigning the next free parallel key
    ///
    /// Returns the key assigned to the new edge.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, highway: Option<RoadTag>) -> u32 {
        let key = self
            .edges
            .iter()
            .filter(|edge| edge.u == u && edge.v == v)
            .map(|edge| edge.key + 1)
            .max()
            .unwrap_or(0);
        self.edges.push(Edge {
            u,
            v,
            key,
            highway,
            name: None,
            length_m: None,
            osm_way_id: None,
        });
        key
    }

    /// Append a fully specified edge as-is
    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.nodes.is_empty()
    }

    /// Build a new graph holding every node and the edges for which `keep` is true
    pub fn retain_edges<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Edge) -> bool,
    {
        Self {
            directed: self.directed,
            nodes: self.nodes.clone(),
            edges: self.edges.iter().filter(|e| keep(e)).cloned().collect(),
        }
    }
}

/// Haversine distance in meters
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_008.8;
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_road_tag_primary() {
        assert_eq!(RoadTag::from("primary").primary(), "primary");
        assert_eq!(
            RoadTag::from(vec!["residential", "motorway"]).primary(),
            "residential"
        );
        assert_eq!(RoadTag::List(Vec::new()).primary(), UNCLASSIFIED);
    }

    #[test]
    fn test_untagged_edge_is_unclassified() {
        let mut graph = StreetNetworkGraph::new(true);
        graph.add_edge(1, 2, None);
        let edge = &graph.edges()[0];
        assert_eq!(edge.primary_tag(), UNCLASSIFIED);
        assert_eq!(edge.tag_values(), vec![UNCLASSIFIED]);
    }

    #[test]
    fn test_parallel_edges_get_distinct_keys() {
        let mut graph = StreetNetworkGraph::new(true);
        graph.add_node(1, 48.85, 2.35);
        graph.add_node(2, 48.86, 2.36);
        assert_eq!(graph.add_edge(1, 2, Some("primary".into())), 0);
        assert_eq!(graph.add_edge(1, 2, Some("service".into())), 1);
        assert_eq!(graph.add_edge(2, 1, Some("primary".into())), 0);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_retain_edges_leaves_source_untouched() {
        let mut graph = StreetNetworkGraph::new(true);
        graph.add_node(1, 0.0, 0.0);
        graph.add_node(2, 0.0, 0.001);
        graph.add_edge(1, 2, Some("motorway".into()));
        graph.add_edge(2, 1, Some("residential".into()));

        let kept = graph.retain_edges(|edge| edge.primary_tag() == "motorway");
        assert_eq!(kept.edge_count(), 1);
        assert_eq!(kept.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_graph_json_shape() {
        let mut graph = StreetNetworkGraph::new(true);
        graph.add_node(7, 51.5, -0.12);
        graph.add_node(8, 51.6, -0.13);
        graph.add_edge(7, 8, Some(vec!["secondary", "tertiary"].into()));

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["edges"][0]["highway"][1], "tertiary");
        assert!(json["edges"][0].get("name").is_none());

        let back: StreetNetworkGraph = serde_json::from_value(json).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 100.0);
    }
}
