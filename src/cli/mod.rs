//! Command-line interface components
//!
//! This module contains CLI-specific code for the City Map Fetcher
//! application, including argument parsing, command handlers and the fetch
//! spinner.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    CacheAction, CacheArgs, Cli, Commands, ConfigAction, ConfigArgs, FetchArgs, GlobalArgs,
    ThemesArgs,
};
pub use commands::{handle_cache, handle_config, handle_fetch, handle_themes};
pub use progress::{FetchSpinner, ProgressConfig};
