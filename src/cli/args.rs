//! Command-line argument parsing for City Map Fetcher
//!
//! This module defines the CLI structure using clap derive macros: fetching
//! map data for a city, inspecting and cleaning the cache, listing themes and
//! creating the config file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::app::{MapRequest, TierSet};
use crate::constants::fetcher::DEFAULT_RADIUS_M;

/// City Map Fetcher - OpenStreetMap data for city map posters
#[derive(Parser, Debug)]
#[command(
    name = "citymap_fetcher",
    version,
    about = "Fetch and cache street networks, water and parks for city map posters",
    long_about = "Downloads the street network, water bodies and parks around a city from OpenStreetMap.
Results are cached per city and radius, so repeated runs with different themes or
road filters never hit the network again."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch map data for a city (from cache when available)
    Fetch(FetchArgs),

    /// Cache management and verification
    Cache(CacheArgs),

    /// List available themes
    Themes(ThemesArgs),

    /// Create or inspect the configuration file
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// City name (e.g. "Paris")
    #[arg(short = 'c', long)]
    pub city: String,

    /// Country name (e.g. "France")
    #[arg(short = 'C', long)]
    pub country: String,

    /// Map radius in meters
    #[arg(short, long, default_value_t = DEFAULT_RADIUS_M)]
    pub distance: u32,

    /// Theme used to style the render plan (defaults to the configured theme)
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Drop residential streets
    #[arg(long)]
    pub no_small_roads: bool,

    /// Keep only major arteries (drops residential and unclassified roads)
    #[arg(long, conflicts_with = "no_small_roads")]
    pub major_only: bool,

    /// Ignore any cached entry and download everything again
    #[arg(long)]
    pub refresh: bool,
}

impl FetchArgs {
    /// Validate argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.city.trim().is_empty() || self.country.trim().is_empty() {
            return Err("City and country must not be empty".to_string());
        }

        if self.distance == 0 {
            return Err("Distance must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn request(&self) -> MapRequest {
        MapRequest::new(self.city.trim(), self.country.trim(), self.distance)
    }

    /// Road tiers to remove before styling
    pub fn excluded_tiers(&self) -> TierSet {
        if self.major_only {
            TierSet::minor_roads()
        } else if self.no_small_roads {
            TierSet::small_roads()
        } else {
            TierSet::default()
        }
    }
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cache statistics and information
    Info,

    /// Check every entry and report why invalid ones would be re-fetched
    Verify,

    /// Remove leftover staging files and invalid entries
    Clean {
        /// Remove only leftover `metadata.json.*.tmp` files
        #[arg(long, conflicts_with = "invalid_only")]
        orphans_only: bool,

        /// Remove only entries that fail validation
        #[arg(long)]
        invalid_only: bool,

        /// Leave staging files younger than this alone (e.g. "30m"; defaults to config)
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        min_age: Option<Duration>,
    },
}

/// Arguments for the themes command
#[derive(Args, Debug)]
pub struct ThemesArgs {
    /// Themes directory (defaults to the configured directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Load each theme and report problems
    #[arg(long)]
    pub check: bool,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default config file (never overwrites)
    Init {
        /// Where to write it (defaults to --config, then the user config directory)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Print the effective configuration after file and environment overrides
    Show,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::RoadTier;

    fn fetch_args() -> FetchArgs {
        FetchArgs {
            city: "Paris".to_string(),
            country: "France".to_string(),
            distance: 10_000,
            theme: None,
            no_small_roads: false,
            major_only: false,
            refresh: false,
        }
    }

    #[test]
    fn test_fetch_args_validation() {
        let mut args = fetch_args();
        assert!(args.validate().is_ok());

        args.distance = 0;
        assert!(args.validate().is_err());

        args.distance = 10_000;
        args.city = "  ".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_excluded_tiers() {
        let mut args = fetch_args();
        assert!(args.excluded_tiers().is_empty());

        args.no_small_roads = true;
        let tiers = args.excluded_tiers();
        assert!(tiers.contains(RoadTier::Residential));
        assert!(!tiers.contains(RoadTier::Default));

        args.no_small_roads = false;
        args.major_only = true;
        assert!(args.excluded_tiers().contains(RoadTier::Default));
    }

    #[test]
    fn test_request_trims_names() {
        let mut args = fetch_args();
        args.city = " Paris ".to_string();
        let request = args.request();
        assert_eq!(request.city, "Paris");
        assert_eq!(request.radius_m, 10_000);
    }

    #[test]
    fn test_parse_fetch_command() {
        let cli = Cli::try_parse_from([
            "citymap_fetcher",
            "-v",
            "fetch",
            "--city",
            "Tokyo",
            "--country",
            "Japan",
            "--major-only",
        ])
        .unwrap();

        assert_eq!(cli.log_level(), tracing::Level::INFO);
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.distance, DEFAULT_RADIUS_M);
                assert!(args.major_only);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_cache_clean_min_age() {
        let cli = Cli::try_parse_from(["citymap_fetcher", "cache", "clean", "--min-age", "30m"])
            .unwrap();

        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Clean { min_age, .. },
            }) => assert_eq!(min_age, Some(Duration::from_secs(1800))),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_road_filters_rejected() {
        let result = Cli::try_parse_from([
            "citymap_fetcher",
            "fetch",
            "--city",
            "Rome",
            "--country",
            "Italy",
            "--no-small-roads",
            "--major-only",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["citymap_fetcher", "config", "init", "/tmp/cm.toml"])
            .unwrap();

        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Init { path },
            }) => assert_eq!(path, Some(PathBuf::from("/tmp/cm.toml"))),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_quiet_wins() {
        let cli =
            Cli::try_parse_from(["citymap_fetcher", "-q", "--very-verbose", "themes"]).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::ERROR);
    }
}
