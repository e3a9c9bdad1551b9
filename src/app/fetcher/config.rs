//! Configuration for the fetch orchestrator

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::fetcher;
use crate::errors::{ConfigError, ConfigResult};

/// Timeouts applied to each collaborator call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Geocoding timeout
    pub geocode_timeout: Duration,
    /// Street network download timeout
    pub network_timeout: Duration,
    /// Timeout for each optional feature download
    pub feature_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            geocode_timeout: fetcher::GEOCODE_TIMEOUT,
            network_timeout: fetcher::NETWORK_TIMEOUT,
            feature_timeout: fetcher::FEATURE_TIMEOUT,
        }
    }
}

impl FetcherConfig {
    /// Set the geocoding timeout
    pub fn with_geocode_timeout(mut self, timeout: Duration) -> Self {
        self.geocode_timeout = timeout;
        self
    }

    /// Set the street network timeout
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    /// Set the feature download timeout
    pub fn with_feature_timeout(mut self, timeout: Duration) -> Self {
        self.feature_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let timeouts = [
            ("geocode_timeout", self.geocode_timeout),
            ("network_timeout", self.network_timeout),
            ("feature_timeout", self.feature_timeout),
        ];
        for (field, value) in timeouts {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0s".to_string(),
                    reason: "Timeouts must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}
