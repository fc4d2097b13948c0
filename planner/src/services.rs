use std::{future::Future, pin::Pin, sync::Arc};

use shared::{Coordinate, Forecast, LngLat, LocationFix, PlaceCandidate};

use crate::error::{LocationError, ServiceError};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw routing answer, still in `[lng, lat]` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Directions {
    pub geometry: Vec<LngLat>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Forward and reverse geocoding.
pub trait Geocoder: Send + Sync + 'static {
    fn search_locations(
        &self,
        query: String,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<PlaceCandidate>, ServiceError>>;

    fn place_name(&self, coordinate: Coordinate) -> BoxFuture<'_, Result<String, ServiceError>>;
}

/// Road snapping and driving directions.
///
/// Implementations speak the routing API's `[lng, lat]` convention; converting
/// from map coordinates is the caller's job.
pub trait RoutingService: Send + Sync + 'static {
    fn nearest_road(&self, point: LngLat) -> BoxFuture<'_, Result<LngLat, ServiceError>>;

    fn route(&self, points: Vec<LngLat>) -> BoxFuture<'_, Result<Directions, ServiceError>>;
}

pub trait WeatherService: Send + Sync + 'static {
    fn forecast(
        &self,
        coordinate: Coordinate,
        days: u8,
    ) -> BoxFuture<'_, Result<Forecast, ServiceError>>;
}

/// The platform location API.
pub trait PositionSource: Send + Sync + 'static {
    fn current_position(&self) -> BoxFuture<'_, Result<LocationFix, LocationError>>;
}

/// Collaborators handed to a map session at construction.
#[derive(Clone)]
pub struct Services {
    pub geocoder: Arc<dyn Geocoder>,
    pub routing: Arc<dyn RoutingService>,
    pub position: Arc<dyn PositionSource>,
    pub weather: Option<Arc<dyn WeatherService>>,
}

impl Services {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        routing: Arc<dyn RoutingService>,
        position: Arc<dyn PositionSource>,
    ) -> Self {
        Self {
            geocoder,
            routing,
            position,
            weather: None,
        }
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherService>) -> Self {
        self.weather = Some(weather);
        self
    }
}

/// Reports a configured position, e.g. one passed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

impl PositionSource for FixedPosition {
    fn current_position(&self) -> BoxFuture<'_, Result<LocationFix, LocationError>> {
        let fix = LocationFix::at(self.0);
        Box::pin(async move { Ok(fix) })
    }
}

/// Platform without a location API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPositionSource;

impl PositionSource for NoPositionSource {
    fn current_position(&self) -> BoxFuture<'_, Result<LocationFix, LocationError>> {
        Box::pin(async { Err(LocationError::Unsupported) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_position_reports_visible_fix() {
        let fix = FixedPosition(Coordinate::new(56.95, 24.1))
            .current_position()
            .await
            .unwrap();
        assert_eq!(fix.coordinate, Coordinate::new(56.95, 24.1));
        assert!(!fix.hidden);
    }

    #[tokio::test]
    async fn test_missing_platform_is_unsupported() {
        let err = NoPositionSource.current_position().await.unwrap_err();
        assert_eq!(err, LocationError::Unsupported);
    }
}
