use serde::{Deserialize, Serialize};
use shared::LngLat;

use super::read_json;
use crate::{
    config::{require, ServiceConfig},
    error::{ConfigError, ServiceError},
    services::{BoxFuture, Directions, RoutingService},
};

const SERVICE: &str = "openrouteservice";
const PROFILE: &str = "driving-car";
/// Search radius of the snapping endpoint.
pub const SNAP_RADIUS_METERS: u32 = 350;

/// OpenRouteService directions and snapping for the driving profile.
#[derive(Debug, Clone)]
pub struct OpenRouteService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct DirectionsBody<'a> {
    coordinates: &'a [LngLat],
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: LineString,
    properties: Properties,
}

#[derive(Deserialize)]
struct LineString {
    coordinates: Vec<LngLat>,
}

#[derive(Deserialize)]
struct Properties {
    #[serde(default)]
    summary: Summary,
}

// Zero-length routes come back without distance or duration.
#[derive(Deserialize, Default)]
struct Summary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Serialize)]
struct SnapBody {
    locations: [LngLat; 1],
    radius: u32,
}

#[derive(Deserialize)]
struct SnapResponse {
    #[serde(default)]
    locations: Vec<Option<SnappedLocation>>,
}

#[derive(Deserialize)]
struct SnappedLocation {
    location: LngLat,
}

impl OpenRouteService {
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
        let api_key = require(&config.ors_api_key, "ORS_API_KEY")?;
        Ok(Self::new(client, config.ors_base_url.clone(), api_key))
    }

    pub async fn directions(&self, points: &[LngLat]) -> Result<Directions, ServiceError> {
        let url = format!("{}/v2/directions/{PROFILE}/geojson", self.base_url);
        tracing::debug!(points = points.len(), "requesting directions");
        let request = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .json(&DirectionsBody {
                coordinates: points,
            });

        let collection: FeatureCollection = read_json(SERVICE, request).await?;
        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or(ServiceError::EmptyResponse(SERVICE))?;
        Ok(Directions {
            geometry: feature.geometry.coordinates,
            distance_meters: feature.properties.summary.distance,
            duration_seconds: feature.properties.summary.duration,
        })
    }

    pub async fn snap(&self, point: LngLat) -> Result<LngLat, ServiceError> {
        let url = format!("{}/v2/snap/{PROFILE}", self.base_url);
        let request = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .json(&SnapBody {
                locations: [point],
                radius: SNAP_RADIUS_METERS,
            });

        let response: SnapResponse = read_json(SERVICE, request).await?;
        response
            .locations
            .into_iter()
            .next()
            .flatten()
            .map(|snapped| snapped.location)
            .ok_or(ServiceError::NoRoadNearby)
    }
}

impl RoutingService for OpenRouteService {
    fn nearest_road(&self, point: LngLat) -> BoxFuture<'_, Result<LngLat, ServiceError>> {
        Box::pin(self.snap(point))
    }

    fn route(&self, points: Vec<LngLat>) -> BoxFuture<'_, Result<Directions, ServiceError>> {
        Box::pin(async move { self.directions(&points).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directions_body_is_lng_lat_pairs() {
        let points = [LngLat(24.10, 56.95), LngLat(24.12, 56.96)];
        let body = serde_json::to_value(DirectionsBody {
            coordinates: &points,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"coordinates": [[24.10, 56.95], [24.12, 56.96]]})
        );
    }

    #[test]
    fn test_snap_response_with_unmatched_location() {
        let response: SnapResponse =
            serde_json::from_str(r#"{"locations": [null], "metadata": {}}"#).unwrap();
        assert!(matches!(response.locations.as_slice(), [None]));
    }

    #[test]
    fn test_summary_defaults_for_zero_length_route() {
        let collection: FeatureCollection = serde_json::from_str(
            r#"{"features": [{"geometry": {"coordinates": [[24.1, 56.95]]}, "properties": {"summary": {}}}]}"#,
        )
        .unwrap();
        let feature = &collection.features[0];
        assert_eq!(feature.properties.summary.distance, 0.0);
        assert_eq!(feature.geometry.coordinates, vec![LngLat(24.1, 56.95)]);
    }
}
