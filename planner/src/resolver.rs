use shared::{Coordinate, LngLat, QueryStatus, RouteBanner, RouteResult};

use crate::{
    error::{RouteError, ServiceError},
    geodesy::haversine_km,
    markers::MarkerSet,
    services::RoutingService,
};

pub const ROUTE_ERROR_MESSAGE: &str = "Could not build a route between the selected points";

/// In-flight request state for one marker pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub generation: u64,
    pub markers: [Coordinate; 2],
    pub snapped: Option<[Coordinate; 2]>,
    pub status: QueryStatus,
}

/// Intermediate steps reported by [`resolve_route`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Snapping is done; the route is being requested with these points.
    Fetching { snapped: [Coordinate; 2] },
    /// The snapped request failed; retrying with the raw marker coordinates.
    Fallback,
}

/// Route state machine driven by marker-set changes.
///
/// ```text
/// Idle -> Snapping -> Fetching -> Succeeded
///                              -> Fallback -> Succeeded
///                                          -> Failed
/// ```
///
/// Every query gets a fresh generation. Stage and completion reports carrying
/// an older generation are ignored, so a superseded query can never overwrite
/// newer state.
#[derive(Debug, Default)]
pub struct RouteResolver {
    generation: u64,
    status: QueryStatus,
    query: Option<RouteQuery>,
    result: Option<RouteResult>,
    banner: Option<RouteBanner>,
    next_banner_id: u64,
}

impl RouteResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derives the route after the marker set changed. Returns the query to
    /// run when both endpoints are placed.
    pub fn markers_changed(&mut self, markers: &MarkerSet) -> Option<RouteQuery> {
        self.generation += 1;
        match markers.endpoints() {
            Some(endpoints) => {
                let query = RouteQuery {
                    generation: self.generation,
                    markers: endpoints,
                    snapped: None,
                    status: QueryStatus::Snapping,
                };
                tracing::debug!(generation = self.generation, "route query: snapping");
                self.status = QueryStatus::Snapping;
                self.result = None;
                self.query = Some(query.clone());
                Some(query)
            }
            None => {
                self.go_idle();
                None
            }
        }
    }

    /// Drops everything, including queries still in flight.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.go_idle();
    }

    pub fn advance(&mut self, generation: u64, stage: Stage) -> bool {
        if !self.is_current(generation) {
            tracing::debug!(generation, "ignoring stage of superseded route query");
            return false;
        }
        let status = match stage {
            Stage::Fetching { snapped } => {
                if let Some(query) = self.query.as_mut() {
                    query.snapped = Some(snapped);
                }
                QueryStatus::Fetching
            }
            Stage::Fallback => QueryStatus::Fallback,
        };
        tracing::debug!(generation, ?status, "route query advanced");
        self.set_status(status);
        true
    }

    /// Applies a finished query. Returns the id of a newly raised banner so the
    /// caller can schedule its expiry.
    pub fn complete(
        &mut self,
        generation: u64,
        outcome: Result<RouteResult, RouteError>,
    ) -> Option<u64> {
        if !self.is_current(generation) {
            tracing::debug!(generation, "ignoring result of superseded route query");
            return None;
        }
        match outcome {
            Ok(route) => {
                tracing::info!(
                    "route ready: {:.1} km, {:.0} min, {} points",
                    route.distance_km(),
                    route.duration_minutes(),
                    route.geometry.len()
                );
                self.result = Some(route);
                self.banner = None;
                self.set_status(QueryStatus::Succeeded);
                None
            }
            Err(err) => {
                tracing::warn!("{err}");
                self.next_banner_id += 1;
                self.result = None;
                self.banner = Some(RouteBanner {
                    id: self.next_banner_id,
                    message: ROUTE_ERROR_MESSAGE.to_string(),
                });
                self.set_status(QueryStatus::Failed);
                Some(self.next_banner_id)
            }
        }
    }

    /// Clears the banner if it is still the one identified by `id`.
    pub fn expire_banner(&mut self, id: u64) -> bool {
        if self.banner.as_ref().is_some_and(|banner| banner.id == id) {
            self.banner = None;
            true
        } else {
            false
        }
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn query(&self) -> Option<&RouteQuery> {
        self.query.as_ref()
    }

    pub fn result(&self) -> Option<&RouteResult> {
        self.result.as_ref()
    }

    pub fn banner(&self) -> Option<&RouteBanner> {
        self.banner.as_ref()
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.query.is_some()
    }

    fn set_status(&mut self, status: QueryStatus) {
        self.status = status;
        if let Some(query) = self.query.as_mut() {
            query.status = status;
        }
    }

    fn go_idle(&mut self) {
        if self.status != QueryStatus::Idle {
            tracing::debug!(generation = self.generation, "route query: idle");
        }
        self.status = QueryStatus::Idle;
        self.query = None;
        self.result = None;
        self.banner = None;
    }
}

/// Snaps both markers, fetches the route, and retries once with the raw
/// coordinates if the snapped request fails.
pub async fn resolve_route<F>(
    routing: &dyn RoutingService,
    markers: [Coordinate; 2],
    mut on_stage: F,
) -> Result<RouteResult, RouteError>
where
    F: FnMut(Stage) + Send,
{
    let [origin, destination] = markers;
    let (origin_snapped, destination_snapped) =
        tokio::join!(snap(routing, origin), snap(routing, destination));
    let snapped = [origin_snapped, destination_snapped];

    on_stage(Stage::Fetching { snapped });
    let primary = match fetch(routing, snapped).await {
        Ok(route) => return Ok(route),
        Err(err) => err,
    };

    tracing::warn!("snapped route request failed: {primary}; retrying with raw coordinates");
    on_stage(Stage::Fallback);
    fetch(routing, markers)
        .await
        .map_err(|fallback| RouteError { primary, fallback })
}

async fn snap(routing: &dyn RoutingService, coordinate: Coordinate) -> Coordinate {
    match routing.nearest_road(coordinate.to_lng_lat()).await {
        Ok(point) => {
            let snapped = point.to_coordinate();
            tracing::debug!(
                "snapped {} by {:.0} m",
                coordinate.display(),
                haversine_km(coordinate, snapped) * 1000.0
            );
            snapped
        }
        Err(err) => {
            tracing::warn!(
                "snapping {} failed: {err}; using raw coordinate",
                coordinate.display()
            );
            coordinate
        }
    }
}

async fn fetch(
    routing: &dyn RoutingService,
    points: [Coordinate; 2],
) -> Result<RouteResult, ServiceError> {
    let directions = routing
        .route(points.iter().map(|point| point.to_lng_lat()).collect())
        .await?;
    if directions.geometry.is_empty() {
        return Err(ServiceError::EmptyResponse("route geometry"));
    }
    Ok(RouteResult {
        geometry: directions
            .geometry
            .into_iter()
            .map(LngLat::to_coordinate)
            .collect(),
        distance_meters: directions.distance_meters,
        duration_seconds: directions.duration_seconds,
    })
}
