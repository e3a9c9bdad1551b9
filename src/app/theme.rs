//! Poster themes and the render plan handed to a renderer
//!
//! A theme is an explicit value; nothing here holds a "current" theme. The
//! render plan resolves every edge's color role against one theme so a
//! renderer only has to draw.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::graph::NodeId;
use crate::app::models::{GeometryCollection, MapDataset};
use crate::app::roads::{classify_edge, ColorRole, RoadTier};
use crate::constants::themes;
use crate::errors::{ConfigError, ConfigResult};

/// Colors for one poster style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub bg: String,
    pub text: String,
    pub gradient_color: String,
    pub water: String,
    pub parks: String,
    pub road_motorway: String,
    pub road_primary: String,
    pub road_secondary: String,
    pub road_tertiary: String,
    pub road_residential: String,
    pub road_default: String,
}

impl Theme {
    /// Built-in grayscale theme used when no theme file is found
    pub fn feature_based() -> Self {
        Self {
            name: "Feature-Based Shading".to_string(),
            description: None,
            bg: "#FFFFFF".to_string(),
            text: "#000000".to_string(),
            gradient_color: "#FFFFFF".to_string(),
            water: "#C0C0C0".to_string(),
            parks: "#F0F0F0".to_string(),
            road_motorway: "#0A0A0A".to_string(),
            road_primary: "#1A1A1A".to_string(),
            road_secondary: "#2A2A2A".to_string(),
            road_tertiary: "#3A3A3A".to_string(),
            road_residential: "#4A4A4A".to_string(),
            road_default: "#3A3A3A".to_string(),
        }
    }

    pub fn color_for(&self, role: ColorRole) -> &str {
        match role {
            ColorRole::RoadMotorway => &self.road_motorway,
            ColorRole::RoadPrimary => &self.road_primary,
            ColorRole::RoadSecondary => &self.road_secondary,
            ColorRole::RoadTertiary => &self.road_tertiary,
            ColorRole::RoadResidential => &self.road_residential,
            ColorRole::RoadDefault => &self.road_default,
        }
    }

    /// Check every color is `#RGB` or `#RRGGBB`
    pub fn validate(&self, theme_name: &str) -> ConfigResult<()> {
        let colors = [
            ("bg", &self.bg),
            ("text", &self.text),
            ("gradient_color", &self.gradient_color),
            ("water", &self.water),
            ("parks", &self.parks),
            ("road_motorway", &self.road_motorway),
            ("road_primary", &self.road_primary),
            ("road_secondary", &self.road_secondary),
            ("road_tertiary", &self.road_tertiary),
            ("road_residential", &self.road_residential),
            ("road_default", &self.road_default),
        ];

        for (field, value) in colors {
            if !is_hex_color(value) {
                return Err(ConfigError::InvalidTheme {
                    name: theme_name.to_string(),
                    reason: format!("{} is not a hex color: {}", field, value),
                });
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Directory of `<name>.json` theme files
#[derive(Debug, Clone)]
pub struct ThemeLibrary {
    dir: PathBuf,
}

impl Default for ThemeLibrary {
    fn default() -> Self {
        Self::new(themes::DEFAULT_THEMES_DIR)
    }
}

impl ThemeLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of the theme files present, sorted
    pub async fn available(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(read_dir) => read_dir,
            Err(e) => {
                debug!("No themes directory at {}: {}", self.dir.display(), e);
                return names;
            }
        };

        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let path = entry.path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        names
    }

    /// Load a theme by name
    ///
    /// A missing file falls back to [`Theme::feature_based`]; a file that
    /// exists but cannot be parsed is an error.
    pub async fn load(&self, name: &str) -> ConfigResult<Theme> {
        let path = self.dir.join(format!("{}.json", name));
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Theme file '{}' not found, using default {} theme",
                    path.display(),
                    themes::DEFAULT_THEME
                );
                return Ok(Theme::feature_based());
            }
            Err(e) => {
                return Err(ConfigError::InvalidTheme {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let theme: Theme = serde_json::from_slice(&raw).map_err(|e| ConfigError::InvalidTheme {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        theme.validate(name)?;

        info!("Loaded theme: {}", theme.name);
        if let Some(description) = &theme.description {
            debug!("  {}", description);
        }
        Ok(theme)
    }
}

/// One edge with its resolved style
#[derive(Debug, Clone, PartialEq)]
pub struct StyledEdge {
    pub u: NodeId,
    pub v: NodeId,
    pub key: u32,
    pub tier: RoadTier,
    pub color: String,
    pub width: f64,
}

/// Everything a renderer needs, with colors resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub background: String,
    pub text_color: String,
    pub gradient_color: String,
    pub edges: Vec<StyledEdge>,
    pub water: GeometryCollection,
    pub water_color: String,
    pub parks: GeometryCollection,
    pub parks_color: String,
}

impl RenderPlan {
    /// Resolve a dataset against a theme
    ///
    /// Only polygon and multipolygon water/park features are kept.
    pub fn build(dataset: &MapDataset, theme: &Theme) -> Self {
        let edges = dataset
            .graph
            .edges()
            .iter()
            .map(|edge| {
                let style = classify_edge(edge);
                StyledEdge {
                    u: edge.u,
                    v: edge.v,
                    key: edge.key,
                    tier: style.tier,
                    color: theme.color_for(style.color_role).to_string(),
                    width: style.width,
                }
            })
            .collect();

        let polygons = |layer: &Option<GeometryCollection>| {
            layer
                .as_ref()
                .map(GeometryCollection::polygons)
                .unwrap_or_else(GeometryCollection::empty)
        };

        Self {
            background: theme.bg.clone(),
            text_color: theme.text.clone(),
            gradient_color: theme.gradient_color.clone(),
            edges,
            water: polygons(&dataset.water),
            water_color: theme.water.clone(),
            parks: polygons(&dataset.parks),
            parks_color: theme.parks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::graph::{RoadTag, StreetNetworkGraph};
    use crate::app::models::fixtures::water_collection;
    use crate::app::models::Coordinates;
    use tempfile::TempDir;

    fn noir() -> Theme {
        Theme {
            name: "Noir".to_string(),
            description: Some("White on black".to_string()),
            bg: "#000000".to_string(),
            text: "#FFFFFF".to_string(),
            gradient_color: "#000000".to_string(),
            water: "#0A0A0A".to_string(),
            parks: "#111".to_string(),
            road_motorway: "#FFFFFF".to_string(),
            road_primary: "#EEEEEE".to_string(),
            road_secondary: "#DDDDDD".to_string(),
            road_tertiary: "#CCCCCC".to_string(),
            road_residential: "#BBBBBB".to_string(),
            road_default: "#AAAAAA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_theme_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let library = ThemeLibrary::new(temp_dir.path());
        let theme = library.load("does_not_exist").await.unwrap();
        assert_eq!(theme, Theme::feature_based());
    }

    #[tokio::test]
    async fn test_load_and_list_themes() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("noir.json"),
            serde_json::to_vec(&noir()).unwrap(),
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("README.md"), b"themes").unwrap();

        let library = ThemeLibrary::new(temp_dir.path());
        assert_eq!(library.available().await, vec!["noir".to_string()]);
        assert_eq!(library.load("noir").await.unwrap(), noir());
    }

    #[tokio::test]
    async fn test_invalid_theme_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), b"{\"name\": 1}").unwrap();
        let mut bad_color = noir();
        bad_color.water = "blue".to_string();
        std::fs::write(
            temp_dir.path().join("blue.json"),
            serde_json::to_vec(&bad_color).unwrap(),
        )
        .unwrap();

        let library = ThemeLibrary::new(temp_dir.path());
        assert!(matches!(
            library.load("broken").await,
            Err(ConfigError::InvalidTheme { .. })
        ));
        assert!(matches!(
            library.load("blue").await,
            Err(ConfigError::InvalidTheme { .. })
        ));
    }

    #[test]
    fn test_render_plan_resolves_colors() {
        let mut graph = StreetNetworkGraph::new(true);
        graph.add_node(1, 48.85, 2.35);
        graph.add_node(2, 48.86, 2.36);
        graph.add_edge(1, 2, Some(RoadTag::from("motorway")));
        graph.add_edge(1, 2, Some(RoadTag::from("cycleway")));
        let dataset = MapDataset {
            graph,
            water: Some(water_collection()),
            parks: None,
            point: Coordinates::new(48.85, 2.35),
        };

        let plan = RenderPlan::build(&dataset, &noir());
        assert_eq!(plan.edges.len(), 2);
        assert_eq!(plan.edges[0].color, "#FFFFFF");
        assert_eq!(plan.edges[0].width, 1.2);
        assert_eq!(plan.edges[1].tier, RoadTier::Default);
        assert_eq!(plan.edges[1].color, "#AAAAAA");
        assert_eq!(plan.edges[1].key, 1);
        assert_eq!(plan.water.len(), 2);
        assert!(plan.parks.is_empty());
        assert_eq!(plan.background, "#000000");
    }

    #[test]
    fn test_theme_does_not_change_geometry() {
        let dataset = MapDataset {
            graph: StreetNetworkGraph::new(true),
            water: Some(water_collection()),
            parks: None,
            point: Coordinates::new(0.0, 0.0),
        };
        let a = RenderPlan::build(&dataset, &noir());
        let b = RenderPlan::build(&dataset, &Theme::feature_based());
        assert_eq!(a.water, b.water);
        assert_ne!(a.water_color, b.water_color);
    }
}
