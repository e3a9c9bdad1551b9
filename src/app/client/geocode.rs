//! Nominatim geocoding adapter

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::app::models::Coordinates;
use crate::errors::{FetchError, FetchResult, Result};

use super::config::ClientConfig;
use super::http::HttpHandler;
use super::providers::Geocoder;

/// One search result; Nominatim returns coordinates as strings
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint
#[derive(Debug)]
pub struct NominatimGeocoder {
    http_handler: HttpHandler,
    search_url: Url,
}

impl NominatimGeocoder {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;
        let search_url = config.nominatim_url()?;
        Ok(Self {
            http_handler,
            search_url,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, city: &str, country: &str) -> FetchResult<Coordinates> {
        let query = format!("{}, {}", city, country);
        tracing::debug!("Geocoding '{}'", query);

        let places: Vec<NominatimPlace> = self
            .http_handler
            .get_json(
                &self.search_url,
                &[("q", query.as_str()), ("format", "json"), ("limit", "1")],
            )
            .await
            .map_err(|e| match e {
                FetchError::InvalidResponse { .. } | FetchError::ServerError { .. } => {
                    FetchError::GeocodingFailed {
                        city: city.to_string(),
                        country: country.to_string(),
                        reason: e.to_string(),
                    }
                }
                other => other,
            })?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::PlaceNotFound {
                city: city.to_string(),
                country: country.to_string(),
            })?;

        let point = parse_place(&place).ok_or_else(|| FetchError::GeocodingFailed {
            city: city.to_string(),
            country: country.to_string(),
            reason: format!("unparseable coordinates {:?}, {:?}", place.lat, place.lon),
        })?;

        if let Some(name) = &place.display_name {
            tracing::info!("Found: {}", name);
        }
        Ok(point)
    }
}

fn parse_place(place: &NominatimPlace) -> Option<Coordinates> {
    let lat: f64 = place.lat.trim().parse().ok()?;
    let lon: f64 = place.lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
        .then(|| Coordinates::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nominatim_response() {
        let body = r#"[{"place_id": 1, "lat": "48.8588897", "lon": "2.3200410",
                       "display_name": "Paris, Île-de-France, France"}]"#;
        let places: Vec<NominatimPlace> = serde_json::from_str(body).unwrap();
        let point = parse_place(&places[0]).unwrap();
        assert!((point.lat - 48.8588897).abs() < 1e-9);
        assert!((point.lon - 2.3200410).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let place = NominatimPlace {
            lat: "123.0".to_string(),
            lon: "2.0".to_string(),
            display_name: None,
        };
        assert!(parse_place(&place).is_none());
    }

    #[test]
    fn test_geocoder_construction() {
        assert!(NominatimGeocoder::new(&ClientConfig::default()).is_ok());
    }
}
