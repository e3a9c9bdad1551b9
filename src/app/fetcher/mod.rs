//! Fetch orchestration
//!
//! [`MapDataFetcher`] is the entry point for map data: it validates the cache
//! entry for a request, loads it on a hit, and otherwise drives geocoding,
//! the street network download and the optional water and park downloads
//! before committing a new cache entry. Callers receive the same
//! [`MapDataset`] shape either way.
//!
//! Failure handling follows the data's importance:
//!
//! - geocoding and the street network are mandatory; failure or timeout
//!   aborts the request before anything is written
//! - water and parks are optional; failure or timeout is logged and recorded
//!   as an unavailable layer
//! - a cache write failure is fatal
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use citymap_fetcher::app::{
//!     CacheConfig, CacheManager, ClientConfig, FetchOptions, FetcherConfig, MapDataFetcher,
//!     MapRequest, NominatimGeocoder, OverpassClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client_config = ClientConfig::default();
//! let overpass = Arc::new(OverpassClient::new(&client_config)?);
//! let fetcher = MapDataFetcher::new(
//!     CacheManager::new(CacheConfig::default()).await?,
//!     Arc::new(NominatimGeocoder::new(&client_config)?),
//!     overpass.clone(),
//!     overpass,
//!     FetcherConfig::default(),
//! );
//!
//! let request = MapRequest::new("Paris", "France", 10_000);
//! let fetched = fetcher.fetch(&request, FetchOptions::default()).await?;
//! println!("{}: {} edges", fetched.report.source, fetched.dataset.graph.edge_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod report;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::app::cache::{
    CacheKey, CacheManager, CacheVerdict, KeyReservations, MissReason, ReservationStatus,
};
use crate::app::client::{FeatureProvider, Geocoder, StreetNetworkProvider};
use crate::app::models::{Coordinates, GeometryCollection, MapDataset, MapRequest, TagFilter};
use crate::errors::{FetchError, FetchResult, Result};

pub use config::FetcherConfig;
pub use report::{DataSource, FeatureOutcome, FetchReport, FetchedMap};

/// Per-call options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the cache check and rewrite the entry
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
        }
    }
}

/// Cache-first map data fetcher
pub struct MapDataFetcher {
    cache: CacheManager,
    geocoder: Arc<dyn Geocoder>,
    network: Arc<dyn StreetNetworkProvider>,
    features: Arc<dyn FeatureProvider>,
    reservations: KeyReservations,
    config: FetcherConfig,
}

impl MapDataFetcher {
    pub fn new(
        cache: CacheManager,
        geocoder: Arc<dyn Geocoder>,
        network: Arc<dyn StreetNetworkProvider>,
        features: Arc<dyn FeatureProvider>,
        config: FetcherConfig,
    ) -> Self {
        Self {
            cache,
            geocoder,
            network,
            features,
            reservations: KeyReservations::new(),
            config,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Return map data for a request, from cache when possible
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is invalid, geocoding or the street
    /// network download fails or times out, a cached file cannot be parsed,
    /// or the new entry cannot be written
    pub async fn fetch(&self, request: &MapRequest, options: FetchOptions) -> Result<FetchedMap> {
        let started = Instant::now();
        let key = request.key()?;

        let reservation = if self.cache.config().reserve_keys {
            Some(self.reservations.reserve(&key).await)
        } else {
            None
        };

        let miss_reason = if options.force_refresh {
            info!("[refresh] {}: skipping cache check", request);
            None
        } else {
            match self.cache.validate(&key).await {
                CacheVerdict::Hit(_) => {
                    if reservation.as_ref().map(|r| r.status())
                        == Some(ReservationStatus::WaitedForOther)
                    {
                        debug!("{} was fetched by a concurrent request", key);
                    }
                    let fetched = self.load_hit(request, &key, started).await;
                    drop(reservation);
                    self.reservations.cleanup_idle();
                    return fetched;
                }
                CacheVerdict::Miss(reason) => Some(reason),
            }
        };

        let fetched = self.fetch_and_store(request, &key, miss_reason, started).await;
        drop(reservation);
        self.reservations.cleanup_idle();
        fetched
    }

    async fn load_hit(
        &self,
        request: &MapRequest,
        key: &CacheKey,
        started: Instant,
    ) -> Result<FetchedMap> {
        info!("[cache HIT] {}", request);
        info!("Loading from: {}", self.cache.entry_dir(key).display());

        let (dataset, metadata) = self.cache.load(key).await?;
        info!("Coordinates: {}", dataset.point);

        let report = FetchReport {
            source: DataSource::Hit,
            water: FeatureOutcome::from_cached(dataset.water.as_ref()),
            parks: FeatureOutcome::from_cached(dataset.parks.as_ref()),
            metadata,
            elapsed: started.elapsed(),
        };
        Ok(FetchedMap { dataset, report })
    }

    async fn fetch_and_store(
        &self,
        request: &MapRequest,
        key: &CacheKey,
        miss_reason: Option<MissReason>,
        started: Instant,
    ) -> Result<FetchedMap> {
        info!("[cache MISS] {}: fetching from network", request);

        let point = with_timeout(
            "geocoding",
            self.config.geocode_timeout,
            self.geocoder.resolve(&request.city, &request.country),
        )
        .await?;
        info!("Coordinates: {}", point);

        let graph = with_timeout(
            "street network download",
            self.config.network_timeout,
            self.network.fetch_graph(point, request.radius_m),
        )
        .await?;

        let water_filter = TagFilter::water();
        let parks_filter = TagFilter::parks();
        let ((water, water_outcome), (parks, parks_outcome)) = tokio::join!(
            self.fetch_optional("water", &water_filter, point, request.radius_m),
            self.fetch_optional("parks", &parks_filter, point, request.radius_m),
        );

        let dataset = MapDataset {
            graph,
            water,
            parks,
            point,
        };
        let metadata = self.cache.save_atomic(key, request, &dataset).await?;

        let report = FetchReport {
            source: DataSource::Miss {
                reason: miss_reason,
            },
            water: water_outcome,
            parks: parks_outcome,
            metadata,
            elapsed: started.elapsed(),
        };
        Ok(FetchedMap { dataset, report })
    }

    /// Download one optional layer; failures become an outcome, never an error
    async fn fetch_optional(
        &self,
        layer: &str,
        filter: &TagFilter,
        point: Coordinates,
        radius_m: u32,
    ) -> (Option<GeometryCollection>, FeatureOutcome) {
        let result = with_timeout(
            &format!("{} download", layer),
            self.config.feature_timeout,
            self.features.fetch_features(point, radius_m, filter),
        )
        .await;

        match result {
            Ok(collection) if collection.is_empty() => {
                info!("No {} features near {}", layer, point);
                (None, FeatureOutcome::Empty)
            }
            Ok(collection) => {
                debug!("{}: {} features", layer, collection.len());
                let outcome = FeatureOutcome::Available {
                    features: collection.len(),
                };
                (Some(collection), outcome)
            }
            Err(e) => {
                warn!("{} unavailable, continuing without it: {}", layer, e);
                (
                    None,
                    FeatureOutcome::Failed {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }
}

/// Run a collaborator call under a timeout
async fn with_timeout<T, F>(operation: &str, limit: Duration, call: F) -> FetchResult<T>
where
    F: Future<Output = FetchResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}
