use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::GeocoderConfig;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("No geocoding match for '{0}'")]
    NoMatch(String),
}

/// A resolved address
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
}

impl GeoPoint {
    /// GeoJSON point plus address parts, as stored under a bootcamp's `location`
    pub fn to_location(&self) -> Value {
        json!({
            "type": "Point",
            "coordinates": [self.lng, self.lat],
            "formattedAddress": self.formatted_address,
            "street": self.street,
            "city": self.city,
            "state": self.state,
            "zipcode": self.zipcode,
            "country": self.country,
        })
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError>;
}

/// MapQuest geocoding v1 client
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl MapQuestGeocoder {
    /// `None` when no API key is configured
    pub fn from_config(config: &GeocoderConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Some(Self {
            client,
            url: config.url.clone(),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: LatLng,
    #[serde(default)]
    street: String,
    #[serde(default, rename = "adminArea5")]
    city: String,
    #[serde(default, rename = "adminArea3")]
    state: String,
    #[serde(default)]
    postal_code: String,
    #[serde(default, rename = "adminArea1")]
    country: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl MapQuestLocation {
    fn into_point(self) -> GeoPoint {
        let region = format!("{} {}", self.state, self.postal_code);
        let formatted_address = [self.street.as_str(), self.city.as_str(), region.trim(), self.country.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        GeoPoint {
            lat: self.lat_lng.lat,
            lng: self.lat_lng.lng,
            formatted_address,
            street: self.street,
            city: self.city,
            state: self.state,
            zipcode: self.postal_code,
            country: self.country,
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let response: MapQuestResponse = self
            .client
            .get(&self.url)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .map(MapQuestLocation::into_point)
            .ok_or_else(|| GeocodeError::NoMatch(address.to_string()))
    }
}
