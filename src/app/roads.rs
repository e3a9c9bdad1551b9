//! Road hierarchy classification and small-road filtering
//!
//! Both operations are pure: classification maps an OSM `highway` value to a
//! style, and filtering returns a new graph without touching its input.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::app::graph::{Edge, StreetNetworkGraph};

/// Road tier, ordered from most to least prominent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoadTier {
    Motorway,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    /// Any tag not listed for another tier
    Default,
}

impl RoadTier {
    pub const ALL: [RoadTier; 6] = [
        RoadTier::Motorway,
        RoadTier::Primary,
        RoadTier::Secondary,
        RoadTier::Tertiary,
        RoadTier::Residential,
        RoadTier::Default,
    ];

    /// Classify a single `highway` value
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "motorway" | "motorway_link" => RoadTier::Motorway,
            "trunk" | "trunk_link" | "primary" | "primary_link" => RoadTier::Primary,
            "secondary" | "secondary_link" => RoadTier::Secondary,
            "tertiary" | "tertiary_link" => RoadTier::Tertiary,
            "residential" | "living_street" | "unclassified" => RoadTier::Residential,
            _ => RoadTier::Default,
        }
    }

    pub fn color_role(&self) -> ColorRole {
        match self {
            RoadTier::Motorway => ColorRole::RoadMotorway,
            RoadTier::Primary => ColorRole::RoadPrimary,
            RoadTier::Secondary => ColorRole::RoadSecondary,
            RoadTier::Tertiary => ColorRole::RoadTertiary,
            RoadTier::Residential => ColorRole::RoadResidential,
            RoadTier::Default => ColorRole::RoadDefault,
        }
    }

    /// Stroke width multiplier; never increases down the hierarchy
    pub fn width(&self) -> f64 {
        match self {
            RoadTier::Motorway => 1.2,
            RoadTier::Primary => 1.0,
            RoadTier::Secondary => 0.8,
            RoadTier::Tertiary => 0.6,
            RoadTier::Residential | RoadTier::Default => 0.4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoadTier::Motorway => "motorway",
            RoadTier::Primary => "primary",
            RoadTier::Secondary => "secondary",
            RoadTier::Tertiary => "tertiary",
            RoadTier::Residential => "residential",
            RoadTier::Default => "default",
        }
    }
}

impl fmt::Display for RoadTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme color slot a road is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorRole {
    RoadMotorway,
    RoadPrimary,
    RoadSecondary,
    RoadTertiary,
    RoadResidential,
    RoadDefault,
}

impl ColorRole {
    /// Theme file key for this role
    pub fn key(&self) -> &'static str {
        match self {
            ColorRole::RoadMotorway => "road_motorway",
            ColorRole::RoadPrimary => "road_primary",
            ColorRole::RoadSecondary => "road_secondary",
            ColorRole::RoadTertiary => "road_tertiary",
            ColorRole::RoadResidential => "road_residential",
            ColorRole::RoadDefault => "road_default",
        }
    }
}

/// Classification result for one road
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadStyle {
    pub tier: RoadTier,
    pub color_role: ColorRole,
    pub width: f64,
}

impl From<RoadTier> for RoadStyle {
    fn from(tier: RoadTier) -> Self {
        Self {
            tier,
            color_role: tier.color_role(),
            width: tier.width(),
        }
    }
}

/// Classify a `highway` value
pub fn classify(tag: &str) -> RoadStyle {
    RoadTier::from_tag(tag).into()
}

/// Classify an edge by its first listed tag
pub fn classify_edge(edge: &Edge) -> RoadStyle {
    classify(edge.primary_tag())
}

/// Set of tiers to drop from a graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierSet(BTreeSet<RoadTier>);

impl TierSet {
    pub fn new(tiers: impl IntoIterator<Item = RoadTier>) -> Self {
        Self(tiers.into_iter().collect())
    }

    /// Residential streets only
    pub fn small_roads() -> Self {
        Self::new([RoadTier::Residential])
    }

    /// Residential streets and unrecognised road types, leaving tertiary and above
    pub fn minor_roads() -> Self {
        Self::new([RoadTier::Residential, RoadTier::Default])
    }

    pub fn contains(&self, tier: RoadTier) -> bool {
        self.0.contains(&tier)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RoadTier> + '_ {
        self.0.iter().copied()
    }
}

/// Whether an edge falls entirely inside the exclusion set
///
/// Multi-tag edges are excluded only when every tag is.
pub fn is_excluded(edge: &Edge, exclude: &TierSet) -> bool {
    edge.tag_values()
        .into_iter()
        .all(|tag| exclude.contains(RoadTier::from_tag(tag)))
}

/// A new graph without edges whose tiers are all excluded
///
/// Nodes are kept even when they lose every edge.
pub fn filter_roads(graph: &StreetNetworkGraph, exclude: &TierSet) -> StreetNetworkGraph {
    if exclude.is_empty() {
        return graph.clone();
    }
    graph.retain_edges(|edge| !is_excluded(edge, exclude))
}

/// Edge count per tier, classified by first tag
pub fn tier_counts(graph: &StreetNetworkGraph) -> BTreeMap<RoadTier, usize> {
    let mut counts = BTreeMap::new();
    for edge in graph.edges() {
        *counts.entry(classify_edge(edge).tier).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::graph::RoadTag;

    fn graph_with(tags: &[Option<RoadTag>]) -> StreetNetworkGraph {
        let mut graph = StreetNetworkGraph::new(true);
        for i in 0..=tags.len() as u64 {
            graph.add_node(i, 48.0 + i as f64 * 0.001, 2.0);
        }
        for (i, tag) in tags.iter().enumerate() {
            graph.add_edge(i as u64, i as u64 + 1, tag.clone());
        }
        graph
    }

    #[test]
    fn test_classify_table() {
        assert_eq!(classify("motorway_link").tier, RoadTier::Motorway);
        assert_eq!(classify("trunk").tier, RoadTier::Primary);
        assert_eq!(classify("primary_link").tier, RoadTier::Primary);
        assert_eq!(classify("secondary").tier, RoadTier::Secondary);
        assert_eq!(classify("tertiary_link").tier, RoadTier::Tertiary);
        assert_eq!(classify("living_street").tier, RoadTier::Residential);
        assert_eq!(classify("unclassified").tier, RoadTier::Residential);
        assert_eq!(classify("footway").tier, RoadTier::Default);
        assert_eq!(classify("").tier, RoadTier::Default);
    }

    #[test]
    fn test_default_tier_has_its_own_color() {
        let residential = classify("residential");
        let fallback = classify("service");
        assert_eq!(residential.width, fallback.width);
        assert_ne!(residential.color_role, fallback.color_role);
        assert_eq!(fallback.color_role.key(), "road_default");
    }

    #[test]
    fn test_widths_descend() {
        let widths: Vec<f64> = RoadTier::ALL.iter().map(RoadTier::width).collect();
        assert!(widths.windows(2).all(|pair| pair[0] >= pair[1]));
        assert_eq!(widths[0], 1.2);
    }

    #[test]
    fn test_list_tag_uses_first_element() {
        let graph = graph_with(&[
            Some(RoadTag::from(vec!["residential", "motorway"])),
            Some(RoadTag::from(vec!["motorway", "residential"])),
            Some(RoadTag::List(Vec::new())),
            None,
        ]);
        let tiers: Vec<RoadTier> = graph.edges().iter().map(|e| classify_edge(e).tier).collect();
        assert_eq!(
            tiers,
            vec![
                RoadTier::Residential,
                RoadTier::Motorway,
                RoadTier::Residential,
                RoadTier::Residential
            ]
        );
    }

    #[test]
    fn test_filter_is_pure_and_counts_add_up() {
        let graph = graph_with(&[
            Some("motorway".into()),
            Some("residential".into()),
            Some("living_street".into()),
            Some("primary".into()),
            Some("footway".into()),
        ]);
        let snapshot = graph.clone();

        let filtered = filter_roads(&graph, &TierSet::small_roads());

        assert_eq!(graph, snapshot);
        assert_eq!(filtered.edge_count(), 3);
        let removed = graph.edge_count() - filtered.edge_count();
        let residential = tier_counts(&graph)[&RoadTier::Residential];
        assert_eq!(removed, residential);
        assert_eq!(filtered.node_count(), graph.node_count());
    }

    #[test]
    fn test_minor_roads_preset_keeps_major_arteries() {
        let graph = graph_with(&[
            Some("tertiary".into()),
            Some("service".into()),
            Some("residential".into()),
            Some("trunk".into()),
        ]);
        let filtered = filter_roads(&graph, &TierSet::minor_roads());
        let kept: Vec<&str> = filtered.edges().iter().map(Edge::primary_tag).collect();
        assert_eq!(kept, vec!["tertiary", "trunk"]);
    }

    #[test]
    fn test_list_edge_removed_only_when_all_excluded() {
        let graph = graph_with(&[
            Some(RoadTag::from(vec!["residential", "motorway"])),
            Some(RoadTag::from(vec!["residential", "living_street"])),
        ]);
        let filtered = filter_roads(&graph, &TierSet::small_roads());
        assert_eq!(filtered.edge_count(), 1);
        assert_eq!(filtered.edges()[0].primary_tag(), "residential");
        assert!(filtered.edges()[0].tag_values().contains(&"motorway"));
    }

    #[test]
    fn test_empty_exclusion_keeps_everything() {
        let graph = graph_with(&[Some("residential".into()), None]);
        assert_eq!(filter_roads(&graph, &TierSet::default()), graph);
    }
}
