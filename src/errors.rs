//! Error types for City Map Fetcher
//!
//! Errors are grouped by the layer that produces them. A cache *miss* is not an
//! error: the validator reports it as a [`MissReason`](crate::app::cache::MissReason)
//! value and the fetcher falls through to the network path. Everything in this
//! module is fatal for the request that raised it, except where noted.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while acquiring data from external collaborators
#[derive(Error, Debug)]
pub enum FetchError {
    /// The geocoder could not resolve the place
    #[error("Could not find coordinates for {city}, {country}")]
    PlaceNotFound { city: String, country: String },

    /// The geocoding service itself failed
    #[error("Geocoding failed for {city}, {country}: {reason}")]
    GeocodingFailed {
        city: String,
        country: String,
        reason: String,
    },

    /// The street network provider failed (mandatory data)
    #[error("Street network download failed: {reason}")]
    StreetNetwork { reason: String },

    /// A feature provider failed (only fatal when called directly)
    #[error("Feature download failed ({layer}): {reason}")]
    Features { layer: String, reason: String },

    /// A collaborator call exceeded its configured timeout
    #[error("{operation} timed out after {seconds} seconds")]
    Timeout { operation: String, seconds: u64 },

    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503/504")]
    ServerOverloaded,

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded for request")]
    MaxRetriesExceeded { max_retries: u32 },

    /// Provider response could not be interpreted
    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Cache persistence and loading errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be created or read
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// Writing a cache file failed
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing a dataset component failed
    #[error("Failed to serialize {what}: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Atomic rename of the staged metadata file failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// A file the validator reported present could not be read back
    #[error("Cache entry corrupted at {path}: {reason}")]
    LoadCorruption { path: PathBuf, reason: String },

    /// Removing cache content failed
    #[error("Failed to remove {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Theme file exists but cannot be used
    #[error("Theme '{name}' could not be loaded: {reason}")]
    InvalidTheme { name: String, reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Fetch(FetchError::Timeout { .. })
                | AppError::Fetch(FetchError::RateLimitExceeded)
                | AppError::Fetch(FetchError::ServerOverloaded)
                | AppError::Fetch(FetchError::Http(_))
                | AppError::Fetch(FetchError::MaxRetriesExceeded { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(FetchError::PlaceNotFound { .. })
            | AppError::Fetch(FetchError::GeocodingFailed { .. }) => "geocoding",
            AppError::Fetch(_) => "fetch",
            AppError::Cache(CacheError::LoadCorruption { .. }) => "cache-corruption",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
