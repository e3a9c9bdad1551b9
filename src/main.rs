//! City Map Fetcher CLI application
//!
//! Command-line interface for fetching and caching OpenStreetMap street
//! networks, water and parks for city map posters.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use citymap_fetcher::cli::{
    handle_cache, handle_config, handle_fetch, handle_themes, Cli, Commands,
};
use citymap_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    init_logging(&cli);

    info!("City Map Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let global = cli.global;
    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(args, &global).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(args, &global).await
        }
        Commands::Themes(args) => {
            info!("Executing themes command");
            handle_themes(args, &global).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args, &global).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("citymap_fetcher={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
