use serde::Deserialize;
use shared::{Coordinate, PlaceCandidate};

use super::read_json;
use crate::{
    config::{require, ServiceConfig},
    error::{ConfigError, ServiceError},
    services::{BoxFuture, Geocoder},
};

const SERVICE: &str = "opencage";

#[derive(Debug, Clone)]
pub struct OpenCage {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted: String,
    geometry: Geometry,
    #[serde(default)]
    components: Components,
}

#[derive(Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize, Default)]
struct Components {
    country: Option<String>,
}

impl From<GeocodeResult> for PlaceCandidate {
    fn from(result: GeocodeResult) -> Self {
        PlaceCandidate {
            formatted: result.formatted,
            coordinate: Coordinate::new(result.geometry.lat, result.geometry.lng),
            country: result.components.country,
        }
    }
}

impl OpenCage {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(
        config: &ServiceConfig,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let api_key = require(&config.opencage_api_key, "OPENCAGE_API_KEY")?;
        Ok(Self::new(client, config.opencage_base_url.clone(), api_key))
    }

    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<GeocodeResult>, ServiceError> {
        let url = format!("{}/geocode/v1/json", self.base_url);
        let limit = limit.to_string();
        let request = self.client.get(url).query(&[
            ("q", query),
            ("key", self.api_key.as_str()),
            ("limit", limit.as_str()),
            ("no_annotations", "1"),
        ]);
        let response: GeocodeResponse = read_json(SERVICE, request).await?;
        Ok(response.results)
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlaceCandidate>, ServiceError> {
        let results = self.geocode(query, limit).await?;
        tracing::debug!("{} candidates for {query:?}", results.len());
        Ok(results.into_iter().map(PlaceCandidate::from).collect())
    }

    pub async fn reverse(&self, coordinate: Coordinate) -> Result<String, ServiceError> {
        let query = format!("{},{}", coordinate.lat, coordinate.lon);
        self.geocode(&query, 1)
            .await?
            .into_iter()
            .next()
            .map(|result| result.formatted)
            .ok_or(ServiceError::EmptyResponse(SERVICE))
    }
}

impl Geocoder for OpenCage {
    fn search_locations(
        &self,
        query: String,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<PlaceCandidate>, ServiceError>> {
        Box::pin(async move { self.search(&query, limit).await })
    }

    fn place_name(&self, coordinate: Coordinate) -> BoxFuture<'_, Result<String, ServiceError>> {
        Box::pin(self.reverse(coordinate))
    }
}
