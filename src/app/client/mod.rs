//! External data collaborators
//!
//! The fetcher depends only on the traits in [`providers`]. The concrete
//! adapters talk to a Nominatim geocoder and an Overpass API endpoint
//! through a shared rate-limited, retrying [`http::HttpHandler`].
//!
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations with resilience patterns
//! - `providers`: Collaborator traits
//! - `geocode`: Nominatim adapter
//! - `overpass`: Overpass adapter for street networks and features

pub mod config;
pub mod geocode;
pub mod http;
pub mod overpass;
pub mod providers;

pub use config::ClientConfig;
pub use geocode::NominatimGeocoder;
pub use overpass::OverpassClient;
pub use providers::{FeatureProvider, Geocoder, StreetNetworkProvider};
