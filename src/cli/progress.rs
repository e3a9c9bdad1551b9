//! Spinner display for network fetches
//!
//! A fetch is a handful of long, opaque network calls, so progress is a
//! single indicatif spinner with a status message rather than a bar. When
//! stderr is not a terminal the spinner is replaced by plain log lines.
//!
//! # Examples
//!
//! ```rust,no_run
//! use citymap_fetcher::cli::{FetchSpinner, ProgressConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut spinner = FetchSpinner::new(ProgressConfig::default());
//! spinner.start("Fetching Paris, France")?;
//! spinner.set_message("Downloading street network");
//! spinner.finish("Done");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::errors::{AppError, Result};

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable the animated spinner
    pub enable_spinner: bool,
    /// Spinner redraw interval
    pub tick_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_spinner: true,
            tick_interval: Duration::from_millis(120),
        }
    }
}

/// Spinner shown while a fetch is in flight
pub struct FetchSpinner {
    config: ProgressConfig,
    bar: Option<ProgressBar>,
    is_terminal: bool,
}

impl FetchSpinner {
    /// Create a new spinner with the given configuration
    pub fn new(config: ProgressConfig) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);

        Self {
            config,
            bar: None,
            is_terminal,
        }
    }

    /// Whether output goes to an animated spinner rather than log lines
    pub fn is_animated(&self) -> bool {
        self.config.enable_spinner && self.is_terminal
    }

    /// Start spinning with an initial message
    ///
    /// # Errors
    ///
    /// Returns an error if the spinner template is rejected
    pub fn start(&mut self, message: &str) -> Result<()> {
        if !self.is_animated() {
            // Fallback to simple text progress
            info!("{}", message);
            return Ok(());
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .map_err(|e| AppError::generic(format!("Spinner template error: {}", e)))?,
        );
        bar.enable_steady_tick(self.config.tick_interval);
        bar.set_message(message.to_string());
        self.bar = Some(bar);

        debug!("Spinner started");
        Ok(())
    }

    pub fn set_message(&self, message: &str) {
        match &self.bar {
            Some(bar) => bar.set_message(message.to_string()),
            None => debug!("{}", message),
        }
    }

    /// Stop the spinner, leaving a final message on screen
    pub fn finish(&mut self, message: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(message.to_string());
        }
    }

    /// Stop the spinner and erase it
    pub fn clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for FetchSpinner {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> ProgressConfig {
        ProgressConfig {
            enable_spinner: false, // Disable for testing
            tick_interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_text_mode_fallback() {
        let mut spinner = FetchSpinner::new(create_test_config());
        assert!(!spinner.is_animated());

        spinner.start("Fetching").unwrap();
        assert!(spinner.bar.is_none());

        spinner.set_message("still fetching");
        spinner.finish("done");
    }

    #[test]
    fn test_progress_config_defaults() {
        let config = ProgressConfig::default();
        assert!(config.enable_spinner);
        assert_eq!(config.tick_interval, Duration::from_millis(120));
    }
}
