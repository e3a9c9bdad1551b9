//! HTTP client configuration and building logic
//!
//! One configuration drives both the geocoding and the Overpass adapters.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{endpoints, http, limits};
use crate::errors::{FetchError, FetchResult};

/// Configuration for the HTTP adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Nominatim-compatible search endpoint
    pub nominatim_url: String,
    /// Overpass API interpreter endpoint
    pub overpass_url: String,
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of connections per host
    pub pool_max_per_host: usize,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit (requests per second, per adapter)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nominatim_url: endpoints::NOMINATIM_URL.to_string(),
            overpass_url: endpoints::OVERPASS_URL.to_string(),
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> FetchResult<Client> {
        let mut client_builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(FetchError::Http)
    }

    pub fn nominatim_url(&self) -> FetchResult<Url> {
        parse_url(&self.nominatim_url)
    }

    pub fn overpass_url(&self) -> FetchResult<Url> {
        parse_url(&self.overpass_url)
    }
}

fn parse_url(raw: &str) -> FetchResult<Url> {
    Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert_eq!(config.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(
            config.overpass_url().unwrap().as_str(),
            endpoints::OVERPASS_URL
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = ClientConfig {
            nominatim_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.nominatim_url(),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_http_client_with_custom_config() {
        let config = ClientConfig {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ..Default::default()
        };

        assert!(config.build_http_client().is_ok());
    }
}
