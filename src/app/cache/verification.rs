//! Cache entry validation
//!
//! Decides whether an entry directory may be served as a cache hit. The
//! checks run in a fixed order and stop at the first failure; a failure is
//! reported as a [`MissReason`] and logged, never raised. Validation only
//! reads the filesystem, so it is safe to run speculatively on every request.

use std::fmt;
use std::path::Path;

use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};

use super::metadata::{CacheMetadata, REQUIRED_KEYS};
use super::path::EntryPaths;
use crate::constants::files;

/// Why an entry directory cannot be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// Entry directory does not exist
    DirectoryMissing,
    /// `metadata.json` is absent (never written, or write interrupted)
    MetadataMissing,
    /// `metadata.json` exists but is not a JSON object
    MetadataUnreadable { reason: String },
    /// Graph file is absent
    GraphMissing,
    /// One or more required metadata keys are absent
    MissingKeys { keys: Vec<String> },
    /// An availability flag is not a boolean
    FlagNotBoolean { flag: &'static str },
    /// An availability flag is true but its data file is absent
    DataFileMissing {
        flag: &'static str,
        file: &'static str,
    },
    /// Keys are present but a value has the wrong type
    InvalidField { reason: String },
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::DirectoryMissing => write!(f, "cache directory does not exist"),
            MissReason::MetadataMissing => write!(f, "{} not found", files::METADATA_FILE),
            MissReason::MetadataUnreadable { reason } => {
                write!(f, "{} unreadable ({})", files::METADATA_FILE, reason)
            }
            MissReason::GraphMissing => write!(f, "{} not found", files::GRAPH_FILE),
            MissReason::MissingKeys { keys } => {
                write!(f, "{} missing keys [{}]", files::METADATA_FILE, keys.join(", "))
            }
            MissReason::FlagNotBoolean { flag } => write!(f, "{} is not a boolean", flag),
            MissReason::DataFileMissing { flag, file } => {
                write!(f, "{} missing despite {}=true", file, flag)
            }
            MissReason::InvalidField { reason } => {
                write!(f, "{} has an invalid field ({})", files::METADATA_FILE, reason)
            }
        }
    }
}

/// Outcome of validating one entry directory
#[derive(Debug, Clone, PartialEq)]
pub enum CacheVerdict {
    /// Entry is complete; carries the parsed metadata
    Hit(CacheMetadata),
    /// Entry must be (re)fetched
    Miss(MissReason),
}

impl CacheVerdict {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheVerdict::Hit(_))
    }

    pub fn miss_reason(&self) -> Option<&MissReason> {
        match self {
            CacheVerdict::Miss(reason) => Some(reason),
            CacheVerdict::Hit(_) => None,
        }
    }
}

/// Entry directory validator
pub struct CacheValidator;

impl CacheValidator {
    /// Validate an entry directory, logging the reason on a miss
    pub async fn validate(dir: &Path) -> CacheVerdict {
        let verdict = Self::check(dir).await;
        match &verdict {
            CacheVerdict::Hit(_) => debug!("Cache entry valid: {}", dir.display()),
            // A directory that was never created is the normal first-run miss
            CacheVerdict::Miss(MissReason::DirectoryMissing) => {
                debug!("No cache entry at {}", dir.display())
            }
            CacheVerdict::Miss(reason) => warn!(
                "Cache entry {} rejected: {}, treating as miss",
                dir.display(),
                reason
            ),
        }
        verdict
    }

    async fn check(dir: &Path) -> CacheVerdict {
        let paths = EntryPaths::new(dir);

        // 1. directory exists
        if !is_dir(&paths.dir).await {
            return CacheVerdict::Miss(MissReason::DirectoryMissing);
        }

        // 2. metadata exists and parses as a JSON object
        let raw = match fs::read(&paths.metadata).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return CacheVerdict::Miss(MissReason::MetadataMissing);
            }
            Err(e) => {
                return CacheVerdict::Miss(MissReason::MetadataUnreadable {
                    reason: e.to_string(),
                });
            }
        };
        let object = match serde_json::from_slice::<Value>(&raw) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                return CacheVerdict::Miss(MissReason::MetadataUnreadable {
                    reason: format!("expected a JSON object, found {}", json_type(&other)),
                });
            }
            Err(e) => {
                return CacheVerdict::Miss(MissReason::MetadataUnreadable {
                    reason: e.to_string(),
                });
            }
        };

        // 3. graph file exists
        if !is_file(&paths.graph).await {
            return CacheVerdict::Miss(MissReason::GraphMissing);
        }

        // 4. every required key present
        let missing = missing_keys(&object);
        if !missing.is_empty() {
            return CacheVerdict::Miss(MissReason::MissingKeys { keys: missing });
        }

        // 5. availability flags are booleans
        let Some(water_available) = object["water_available"].as_bool() else {
            return CacheVerdict::Miss(MissReason::FlagNotBoolean {
                flag: "water_available",
            });
        };
        let Some(parks_available) = object["parks_available"].as_bool() else {
            return CacheVerdict::Miss(MissReason::FlagNotBoolean {
                flag: "parks_available",
            });
        };

        // 6. flagged data files present
        if water_available && !is_file(&paths.water).await {
            return CacheVerdict::Miss(MissReason::DataFileMissing {
                flag: "water_available",
                file: files::WATER_FILE,
            });
        }
        if parks_available && !is_file(&paths.parks).await {
            return CacheVerdict::Miss(MissReason::DataFileMissing {
                flag: "parks_available",
                file: files::PARKS_FILE,
            });
        }

        match serde_json::from_value::<CacheMetadata>(Value::Object(object)) {
            Ok(metadata) => CacheVerdict::Hit(metadata),
            Err(e) => CacheVerdict::Miss(MissReason::InvalidField {
                reason: e.to_string(),
            }),
        }
    }
}

fn missing_keys(object: &Map<String, Value>) -> Vec<String> {
    REQUIRED_KEYS
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| key.to_string())
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn valid_metadata() -> Value {
        json!({
            "city": "Paris",
            "country": "France",
            "city_slug": "paris",
            "country_slug": "france",
            "radius_m": 10000,
            "lat": 48.8566,
            "lon": 2.3522,
            "downloaded_at": "2026-01-05T10:00:00Z",
            "source_version": "citymap_fetcher/0.1.0",
            "water_available": false,
            "parks_available": false
        })
    }

    async fn write_entry(dir: &Path, metadata: &Value) {
        fs::create_dir_all(dir).await.unwrap();
        fs::write(dir.join(files::GRAPH_FILE), b"{}").await.unwrap();
        fs::write(
            dir.join(files::METADATA_FILE),
            serde_json::to_vec(metadata).unwrap(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let verdict = CacheValidator::validate(&temp_dir.path().join("absent")).await;
        assert_eq!(verdict, CacheVerdict::Miss(MissReason::DirectoryMissing));
    }

    #[tokio::test]
    async fn test_valid_entry_is_hit() {
        let temp_dir = TempDir::new().unwrap();
        write_entry(temp_dir.path(), &valid_metadata()).await;

        match CacheValidator::validate(temp_dir.path()).await {
            CacheVerdict::Hit(metadata) => {
                assert_eq!(metadata.city, "Paris");
                assert_eq!(metadata.radius_m, 10_000);
            }
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_metadata_missing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(files::GRAPH_FILE), b"{}")
            .await
            .unwrap();
        let verdict = CacheValidator::validate(temp_dir.path()).await;
        assert_eq!(verdict, CacheVerdict::Miss(MissReason::MetadataMissing));
    }

    #[tokio::test]
    async fn test_metadata_unparseable() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(files::GRAPH_FILE), b"{}")
            .await
            .unwrap();
        fs::write(temp_dir.path().join(files::METADATA_FILE), b"{\"city\": ")
            .await
            .unwrap();
        let verdict = CacheValidator::validate(temp_dir.path()).await;
        assert!(matches!(
            verdict,
            CacheVerdict::Miss(MissReason::MetadataUnreadable { .. })
        ));

        fs::write(temp_dir.path().join(files::METADATA_FILE), b"[1, 2]")
            .await
            .unwrap();
        let verdict = CacheValidator::validate(temp_dir.path()).await;
        assert!(matches!(
            verdict,
            CacheVerdict::Miss(MissReason::MetadataUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_metadata_checked_before_graph() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(files::METADATA_FILE),
            serde_json::to_vec(&valid_metadata()).unwrap(),
        )
        .await
        .unwrap();
        let verdict = CacheValidator::validate(temp_dir.path()).await;
        assert_eq!(verdict, CacheVerdict::Miss(MissReason::GraphMissing));
    }

    #[tokio::test]
    async fn test_dropped_lat_reports_missing_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut metadata = valid_metadata();
        metadata.as_object_mut().unwrap().remove("lat");
        write_entry(temp_dir.path(), &metadata).await;

        let verdict = CacheValidator::validate(temp_dir.path()).await;
        assert_eq!(
            verdict,
            CacheVerdict::Miss(MissReason::MissingKeys {
                keys: vec!["lat".to_string()]
            })
        );
        assert!(verdict
            .miss_reason()
            .unwrap()
            .to_string()
            .contains("missing keys"));
    }

    #[tokio::test]
    async fn test_non_boolean_flag() {
        let temp_dir = TempDir::new().unwrap();
        let mut metadata = valid_metadata();
        metadata["parks_available"] = json!("yes");
        write_entry(temp_dir.path(), &metadata).await;

        let verdict = CacheValidator::validate(temp_dir.path()).await;
        assert_eq!(
            verdict,
            CacheVerdict::Miss(MissReason::FlagNotBoolean {
                flag: "parks_available"
            })
        );
    }

    #[tokio::test]
    async fn test_flag_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut metadata = valid_metadata();
        metadata["water_available"] = json!(true);
        write_entry(temp_dir.path(), &metadata).await;

        let verdict = CacheValidator::validate(temp_dir.path()).await;
        assert_eq!(
            verdict,
            CacheVerdict::Miss(MissReason::DataFileMissing {
                flag: "water_available",
                file: files::WATER_FILE,
            })
        );

        fs::write(temp_dir.path().join(files::WATER_FILE), b"{}")
            .await
            .unwrap();
        assert!(CacheValidator::validate(temp_dir.path()).await.is_hit());
    }

    #[tokio::test]
    async fn test_wrong_type_is_invalid_field() {
        let temp_dir = TempDir::new().unwrap();
        let mut metadata = valid_metadata();
        metadata["lat"] = json!("north");
        write_entry(temp_dir.path(), &metadata).await;

        let verdict = CacheValidator::validate(temp_dir.path()).await;
        assert!(matches!(
            verdict,
            CacheVerdict::Miss(MissReason::InvalidField { .. })
        ));
    }

    #[tokio::test]
    async fn test_extra_keys_tolerated() {
        let temp_dir = TempDir::new().unwrap();
        let mut metadata = valid_metadata();
        metadata["note"] = json!("hand edited");
        write_entry(temp_dir.path(), &metadata).await;
        assert!(CacheValidator::validate(temp_dir.path()).await.is_hit());
    }
}
