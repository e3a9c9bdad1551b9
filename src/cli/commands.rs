//! Command handlers for City Map Fetcher CLI
//!
//! This module implements the main command handlers that coordinate between
//! CLI arguments and the core application functionality.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::app::roads::tier_counts;
use crate::app::{
    filter_roads, CacheInspector, CacheManager, CacheVerdict, FetchOptions, FetchedMap,
    MapDataFetcher, MapDataset, NominatimGeocoder, OverpassClient, RenderPlan, ThemeLibrary,
};
use crate::cli::{
    CacheAction, CacheArgs, ConfigAction, ConfigArgs, FetchArgs, FetchSpinner, GlobalArgs,
    ProgressConfig, ThemesArgs,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Load configuration and apply global command-line overrides
async fn load_config(global: &GlobalArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(global.config.as_deref()).await?;
    if let Some(cache_dir) = &global.cache_dir {
        debug!("--cache-dir overrides cache root: {}", cache_dir.display());
        config.cache.cache_root = Some(cache_dir.clone());
    }
    Ok(config)
}

/// Handle the fetch command
///
/// Fetches (or loads from cache) the map data for one city, applies the
/// requested road filter and resolves the result against a theme.
pub async fn handle_fetch(args: FetchArgs, global: &GlobalArgs) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let config = load_config(global).await?;
    let (cache_config, client_config, fetcher_config) = config.to_runtime_config()?;

    let library = ThemeLibrary::new(&config.themes.directory);
    let theme_name = args
        .theme
        .clone()
        .unwrap_or_else(|| config.themes.default_theme.clone());
    let theme = library.load(&theme_name).await?;

    let overpass = Arc::new(OverpassClient::new(&client_config)?);
    let fetcher = MapDataFetcher::new(
        CacheManager::new(cache_config).await?,
        Arc::new(NominatimGeocoder::new(&client_config)?),
        overpass.clone(),
        overpass,
        fetcher_config,
    );

    let request = args.request();
    let options = FetchOptions {
        force_refresh: args.refresh,
    };

    let mut spinner = FetchSpinner::new(ProgressConfig {
        enable_spinner: !global.quiet,
        ..Default::default()
    });
    spinner.start(&format!("Fetching map data for {}", request))?;
    let fetched = fetcher.fetch(&request, options).await;
    spinner.clear();
    let fetched = fetched?;

    let excluded = args.excluded_tiers();
    let FetchedMap { dataset, report } = fetched;
    let edges_before = dataset.graph.edge_count();
    let dataset = MapDataset {
        graph: filter_roads(&dataset.graph, &excluded),
        ..dataset
    };
    if !excluded.is_empty() {
        let tiers: Vec<String> = excluded.iter().map(|t| t.to_string()).collect();
        info!(
            "Filtered roads [{}]: {} -> {} edges",
            tiers.join(", "),
            edges_before,
            dataset.graph.edge_count()
        );
    }

    let plan = RenderPlan::build(&dataset, &theme);

    if global.quiet {
        return Ok(());
    }

    println!("🗺️  {}", request);
    println!("================");
    println!("Source: {}", report.source);
    println!("Coordinates: {}", dataset.point);
    println!(
        "Cache entry: {}",
        fetcher.cache().entry_dir(&request.key()?).display()
    );
    println!(
        "Street network: {} nodes, {} edges",
        dataset.graph.node_count(),
        dataset.graph.edge_count()
    );
    for (tier, count) in tier_counts(&dataset.graph) {
        println!("  {:<12} {}", tier, count);
    }
    println!("Water: {}", report.water);
    println!("Parks: {}", report.parks);
    println!(
        "Theme: {} ({} styled edges, {} water polygons, {} park polygons)",
        theme.name,
        plan.edges.len(),
        plan.water.len(),
        plan.parks.len()
    );
    println!("Downloaded at: {}", report.metadata.downloaded_at.to_rfc3339());
    println!("Elapsed: {:.2?}", report.elapsed);

    Ok(())
}

/// Handle cache management commands
pub async fn handle_cache(args: CacheArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global).await?;
    let cache_config = config.cache.to_runtime_config();
    let orphan_min_age = cache_config.orphan_min_age;
    let cache = CacheManager::new(cache_config).await?;
    let inspector = CacheInspector::new(cache.cache_root());

    match args.action {
        CacheAction::Info => handle_cache_info(&inspector).await,
        CacheAction::Verify => handle_cache_verify(&inspector).await,
        CacheAction::Clean {
            orphans_only,
            invalid_only,
            min_age,
        } => {
            let min_age = min_age.unwrap_or(orphan_min_age);
            handle_cache_clean(&inspector, !invalid_only, !orphans_only, min_age).await
        }
    }
}

/// Handle cache info display
async fn handle_cache_info(inspector: &CacheInspector) -> Result<()> {
    let stats = inspector.stats().await;

    println!("💾 Cache Information");
    println!("===================");
    println!("Location: {}", stats.cache_root.display());
    println!(
        "Entries: {} ({} valid, {} invalid)",
        stats.entries,
        stats.valid_entries,
        stats.invalid_entries()
    );
    println!("Cached files: {}", stats.total_files);
    println!("Cache size: {}", stats.format_cache_size());
    if stats.staged_files > 0 {
        println!(
            "Leftover staging files: {} (run 'citymap_fetcher cache clean')",
            stats.staged_files
        );
    }

    Ok(())
}

/// Handle cache verification
async fn handle_cache_verify(inspector: &CacheInspector) -> Result<()> {
    info!("Verifying cache at {}", inspector.cache_root().display());

    println!("🔍 Cache Verification");
    println!("====================");

    let summaries = inspector.inspect().await;
    if summaries.is_empty() {
        println!("No cache entries found in {}", inspector.cache_root().display());
        return Ok(());
    }

    for summary in &summaries {
        match &summary.verdict {
            CacheVerdict::Hit(metadata) => println!(
                "  ✅ {} ({}, downloaded {})",
                summary.entry.key,
                crate::app::cache::format_bytes(summary.entry.size_bytes),
                metadata.downloaded_at.format("%Y-%m-%d")
            ),
            CacheVerdict::Miss(reason) => {
                println!("  ❌ {}: {}", summary.entry.key, reason)
            }
        }
    }

    let valid = summaries.iter().filter(|s| s.is_valid()).count();
    println!();
    println!("{}/{} entries valid", valid, summaries.len());
    if valid < summaries.len() {
        println!("💡 Invalid entries are re-fetched automatically on next use.");
    }

    Ok(())
}

/// Handle cache cleanup
async fn handle_cache_clean(
    inspector: &CacheInspector,
    orphans: bool,
    invalid: bool,
    min_age: Duration,
) -> Result<()> {
    println!("🧹 Cache Cleanup");
    println!("===============");

    if orphans {
        let report = inspector.clean_orphans(min_age).await?;
        println!(
            "Staging files: {} removed, {} kept (younger than {:?})",
            report.removed.len(),
            report.skipped.len(),
            min_age
        );
    }

    if invalid {
        let report = inspector.clean_invalid(min_age).await?;
        println!(
            "Invalid entries: {} removed, {} kept (write in progress)",
            report.removed.len(),
            report.skipped.len()
        );
        for dir in &report.removed {
            debug!("removed {}", dir.display());
        }
    }

    Ok(())
}

/// Handle the themes command
pub async fn handle_themes(args: ThemesArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global).await?;
    let dir = args.dir.unwrap_or(config.themes.directory);
    let library = ThemeLibrary::new(dir);

    let names = library.available().await;

    println!("🎨 Themes in {}", library.dir().display());
    println!("===============");
    if names.is_empty() {
        warn!("No theme files found in {}", library.dir().display());
        println!(
            "No theme files found; the built-in '{}' theme is used.",
            config.themes.default_theme
        );
        return Ok(());
    }

    if !args.check {
        for name in &names {
            println!("  {}", name);
        }
        return Ok(());
    }

    let results = join_all(names.iter().map(|name| library.load(name))).await;
    let mut failures = 0;
    for (name, result) in names.iter().zip(results) {
        match result {
            Ok(theme) => match &theme.description {
                Some(description) => println!("  ✅ {} - {}", name, description),
                None => println!("  ✅ {}", name),
            },
            Err(e) => {
                failures += 1;
                println!("  ❌ {}: {}", name, e);
            }
        }
    }

    if failures > 0 {
        return Err(AppError::generic(format!(
            "{} of {} themes failed to load",
            failures,
            names.len()
        )));
    }

    Ok(())
}

/// Handle configuration commands
pub async fn handle_config(args: ConfigArgs, global: &GlobalArgs) -> Result<()> {
    match args.action {
        ConfigAction::Init { path } => {
            let path = path
                .or_else(|| global.config.clone())
                .or_else(AppConfig::default_config_path)
                .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

            if AppConfig::initialize_default_file(&path).await? {
                println!("📁 Created default configuration file:");
                println!("   {}", path.display());
                println!("   You can customize settings by editing this file.");
            } else {
                println!("Configuration file already exists: {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(global).await?;
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| AppError::generic(format!("Failed to render configuration: {}", e)))?;
            println!("{}", rendered);
            Ok(())
        }
    }
}
