//! City Map Fetcher Library
//!
//! Cache-first acquisition of OpenStreetMap data for city map posters: a
//! street network plus optional water and park layers per city and radius,
//! persisted atomically and reused across runs, with road classification
//! and filtering for rendering.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(METADATA_FILE, "metadata.json");
        assert_eq!(env::CACHE_DIR, "CITYMAP_CACHE_DIR");
        assert!(USER_AGENT.starts_with("citymap-fetcher/"));
    }

    #[test]
    fn test_error_types() {
        let app_error = AppError::from(errors::CacheError::DirectoryNotAccessible {
            path: std::path::PathBuf::from("/cache"),
        });

        assert_eq!(app_error.category(), "cache");
        assert!(!app_error.is_recoverable());
    }
}
