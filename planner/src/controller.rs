//! The map session actor.
//!
//! All interaction state lives on one tokio task. The public [`MapHandle`]
//! sends commands and waits for their acknowledgement; network work runs in
//! spawned tasks that report back as events. Events carry the route
//! generation or location epoch they were started under and are dropped if
//! that is no longer current.

use std::sync::Arc;

use shared::{CameraView, Coordinate, Forecast, LocationFix, MapLayer, MarkerId, PlaceCandidate};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use crate::{
    click_gate::ClickGate,
    config::MapConfig,
    error::{LocationError, RouteError, ServiceError, SessionClosed},
    geodesy::Bounds,
    geolocation::GeoLocationProvider,
    markers::MarkerSet,
    place_names::PlaceNameCache,
    resolver::{resolve_route, RouteQuery, RouteResolver, Stage},
    services::Services,
    state::MapState,
};

const COMMAND_BUFFER: usize = 64;

/// Where a click came from. Clicks on controls layered over the map must not
/// place markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOrigin {
    Map,
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Placed(MarkerId),
    Blocked,
    Full,
    FromControl,
}

enum Command {
    MapClicked {
        coordinate: Coordinate,
        origin: ClickOrigin,
        reply: oneshot::Sender<ClickOutcome>,
    },
    RemoveMarker {
        index: usize,
        reply: oneshot::Sender<bool>,
    },
    RemoveAll(oneshot::Sender<()>),
    Reset(oneshot::Sender<()>),
    SearchedLocation {
        coordinate: Coordinate,
        reply: oneshot::Sender<()>,
    },
    ToggleLocationVisibility(oneshot::Sender<()>),
    FlyTo {
        camera: CameraView,
        reply: oneshot::Sender<()>,
    },
    FitRoute(oneshot::Sender<bool>),
    ToggleLayer(oneshot::Sender<()>),
}

enum Event {
    LocationAcquired {
        epoch: u64,
        result: Result<LocationFix, LocationError>,
    },
    LocationLabel {
        epoch: u64,
        label: String,
    },
    MarkerLabel {
        id: MarkerId,
        label: String,
    },
    RouteStage {
        generation: u64,
        stage: Stage,
    },
    RouteFinished {
        generation: u64,
        outcome: Result<shared::RouteResult, RouteError>,
    },
    BannerExpired {
        id: u64,
    },
}

/// Replies are held back until the new state has been published.
enum Ack {
    Click(oneshot::Sender<ClickOutcome>, ClickOutcome),
    Flag(oneshot::Sender<bool>, bool),
    Done(oneshot::Sender<()>),
}

impl Ack {
    fn send(self) {
        // A caller that stopped waiting is not an error.
        let _ = match self {
            Ack::Click(reply, outcome) => reply.send(outcome).map_err(drop),
            Ack::Flag(reply, flag) => reply.send(flag).map_err(drop),
            Ack::Done(reply) => reply.send(()).map_err(drop),
        };
    }
}

pub struct MapController {
    config: MapConfig,
    services: Services,
    places: Arc<PlaceNameCache>,
    locator: Arc<GeoLocationProvider>,
    markers: MarkerSet,
    resolver: RouteResolver,
    gate: ClickGate,
    location: Option<LocationFix>,
    location_error: Option<LocationError>,
    location_epoch: u64,
    loading: bool,
    camera: CameraView,
    layer: MapLayer,
    events: mpsc::UnboundedSender<Event>,
    state: watch::Sender<MapState>,
}

impl MapController {
    /// Starts a map session on the current tokio runtime and kicks off the
    /// first location acquisition.
    pub fn spawn(config: MapConfig, services: Services) -> MapHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(MapState::default());

        let places = Arc::new(PlaceNameCache::new(
            Arc::clone(&services.geocoder),
            config.place_cache_capacity,
        ));
        let locator = Arc::new(GeoLocationProvider::new(
            Arc::clone(&services.position),
            config.location_timeout,
        ));

        let mut controller = MapController {
            camera: config.default_camera,
            config: config.clone(),
            services: services.clone(),
            places,
            locator,
            markers: MarkerSet::new(),
            resolver: RouteResolver::new(),
            gate: ClickGate::new(),
            location: None,
            location_error: None,
            location_epoch: 0,
            loading: true,
            layer: MapLayer::default(),
            events: event_tx,
            state: state_tx,
        };
        controller.request_location();
        controller.publish();

        tracing::info!("map session started");
        tokio::spawn(
            controller
                .run(command_rx, event_rx)
                .instrument(tracing::info_span!("map_session")),
        );

        MapHandle {
            commands: command_tx,
            state: state_rx,
            services,
            config,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        let ack = self.update(command);
                        self.publish();
                        ack.send();
                    }
                    None => break,
                },
                Some(event) = events.recv() => {
                    self.apply(event);
                    self.publish();
                }
            }
        }
        tracing::info!("map session closed");
    }

    fn update(&mut self, command: Command) -> Ack {
        match command {
            Command::MapClicked {
                coordinate,
                origin,
                reply,
            } => Ack::Click(reply, self.map_clicked(coordinate, origin)),
            Command::RemoveMarker { index, reply } => {
                self.gate.block(self.config.click_gate);
                let removed = self.markers.remove_at(index);
                if removed {
                    tracing::debug!(index, "marker removed");
                    self.markers_changed();
                }
                Ack::Flag(reply, removed)
            }
            Command::RemoveAll(reply) => {
                self.gate.block(self.config.click_gate);
                self.markers.clear();
                self.markers_changed();
                Ack::Done(reply)
            }
            Command::Reset(reply) => {
                tracing::info!("resetting map session");
                self.gate.block(self.config.click_gate);
                self.markers.clear();
                self.resolver.reset();
                self.places.clear();
                if let Some(fix) = self.location.as_mut() {
                    fix.hidden = false;
                }
                self.request_location();
                Ack::Done(reply)
            }
            Command::SearchedLocation { coordinate, reply } => {
                self.location_epoch += 1;
                self.location = Some(LocationFix::at(coordinate));
                self.location_error = None;
                self.loading = false;
                self.fly_to(coordinate);
                self.resolve_location_label(self.location_epoch, coordinate);
                Ack::Done(reply)
            }
            Command::ToggleLocationVisibility(reply) => {
                match self.location.as_mut() {
                    Some(fix) if !fix.hidden => fix.hidden = true,
                    shown => {
                        if let Some(fix) = shown {
                            fix.hidden = false;
                        }
                        self.gate.block(self.config.click_gate);
                        self.request_location();
                    }
                }
                Ack::Done(reply)
            }
            Command::FlyTo { camera, reply } => {
                self.camera = camera;
                Ack::Done(reply)
            }
            Command::FitRoute(reply) => {
                let bounds = self
                    .resolver
                    .result()
                    .and_then(|route| Bounds::of(&route.geometry));
                let fitted = match bounds {
                    Some(bounds) => {
                        self.camera = CameraView {
                            center: bounds.center(),
                            zoom: bounds.zoom_to_fit(),
                        };
                        true
                    }
                    None => false,
                };
                Ack::Flag(reply, fitted)
            }
            Command::ToggleLayer(reply) => {
                self.layer = self.layer.toggled();
                Ack::Done(reply)
            }
        }
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::LocationAcquired { epoch, result } => {
                if epoch != self.location_epoch {
                    tracing::debug!(epoch, "ignoring superseded location result");
                    return;
                }
                self.loading = false;
                match result {
                    Ok(mut fix) => {
                        fix.hidden = self.location.as_ref().is_some_and(|old| old.hidden);
                        let coordinate = fix.coordinate;
                        self.location = Some(fix);
                        self.location_error = None;
                        self.fly_to(coordinate);
                        self.resolve_location_label(epoch, coordinate);
                    }
                    Err(err) => self.location_error = Some(err),
                }
            }
            Event::LocationLabel { epoch, label } => {
                if epoch == self.location_epoch {
                    if let Some(fix) = self.location.as_mut() {
                        fix.label = Some(label);
                    }
                }
            }
            Event::MarkerLabel { id, label } => {
                if !self.markers.set_label(id, label) {
                    tracing::debug!(?id, "label arrived for a removed marker");
                }
            }
            Event::RouteStage { generation, stage } => {
                self.resolver.advance(generation, stage);
            }
            Event::RouteFinished {
                generation,
                outcome,
            } => {
                if let Some(banner) = self.resolver.complete(generation, outcome) {
                    self.schedule_banner_expiry(banner);
                }
            }
            Event::BannerExpired { id } => {
                if self.resolver.expire_banner(id) {
                    tracing::debug!(id, "route error banner expired");
                }
            }
        }
    }

    fn map_clicked(&mut self, coordinate: Coordinate, origin: ClickOrigin) -> ClickOutcome {
        if origin == ClickOrigin::Control {
            return ClickOutcome::FromControl;
        }
        if self.gate.is_blocked() {
            tracing::debug!("map click swallowed by click gate");
            return ClickOutcome::Blocked;
        }
        if self.markers.is_full() {
            tracing::debug!("map click ignored, both markers placed");
            return ClickOutcome::Full;
        }
        let Some(id) = self.markers.add(coordinate) else {
            return ClickOutcome::Full;
        };
        tracing::info!("marker placed at {}", coordinate.display());
        self.resolve_marker_label(id, coordinate);
        self.markers_changed();
        ClickOutcome::Placed(id)
    }

    fn markers_changed(&mut self) {
        if let Some(query) = self.resolver.markers_changed(&self.markers) {
            self.start_route_query(query);
        }
    }

    fn fly_to(&mut self, center: Coordinate) {
        self.camera = CameraView {
            center,
            zoom: self.camera.zoom,
        };
    }

    fn request_location(&mut self) {
        self.location_epoch += 1;
        let epoch = self.location_epoch;
        let locator = Arc::clone(&self.locator);
        let events = self.events.clone();
        tokio::spawn(
            async move {
                let result = locator.acquire().await;
                let _ = events.send(Event::LocationAcquired { epoch, result });
            }
            .in_current_span(),
        );
    }

    fn resolve_location_label(&self, epoch: u64, coordinate: Coordinate) {
        let places = Arc::clone(&self.places);
        let events = self.events.clone();
        tokio::spawn(
            async move {
                let label = places.resolve(coordinate).await;
                let _ = events.send(Event::LocationLabel { epoch, label });
            }
            .in_current_span(),
        );
    }

    fn resolve_marker_label(&self, id: MarkerId, coordinate: Coordinate) {
        let places = Arc::clone(&self.places);
        let events = self.events.clone();
        tokio::spawn(
            async move {
                let label = places.resolve(coordinate).await;
                let _ = events.send(Event::MarkerLabel { id, label });
            }
            .in_current_span(),
        );
    }

    fn start_route_query(&self, query: RouteQuery) {
        let routing = Arc::clone(&self.services.routing);
        let events = self.events.clone();
        let generation = query.generation;
        tokio::spawn(
            async move {
                let stages = events.clone();
                let outcome = resolve_route(routing.as_ref(), query.markers, |stage| {
                    let _ = stages.send(Event::RouteStage { generation, stage });
                })
                .await;
                let _ = events.send(Event::RouteFinished {
                    generation,
                    outcome,
                });
            }
            .instrument(tracing::debug_span!("route_query", generation)),
        );
    }

    fn schedule_banner_expiry(&self, id: u64) {
        let ttl = self.config.route_error_ttl;
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let _ = events.send(Event::BannerExpired { id });
        });
    }

    fn snapshot(&self) -> MapState {
        MapState {
            markers: self.markers.as_slice().to_vec(),
            location: self.location.clone(),
            location_error: self.location_error.clone(),
            loading: self.loading,
            route: self.resolver.result().cloned(),
            route_status: self.resolver.status(),
            route_error: self.resolver.banner().cloned(),
            camera: self.camera,
            layer: self.layer,
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Cloneable access to a running map session.
///
/// Every command resolves once the session has applied it and published the
/// resulting [`MapState`], so commands from one caller apply in order.
#[derive(Clone)]
pub struct MapHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<MapState>,
    services: Services,
    config: MapConfig,
}

impl MapHandle {
    pub async fn on_map_click(
        &self,
        coordinate: Coordinate,
        origin: ClickOrigin,
    ) -> Result<ClickOutcome, SessionClosed> {
        self.request(|reply| Command::MapClicked {
            coordinate,
            origin,
            reply,
        })
        .await
    }

    /// Returns whether a marker was at `index`.
    pub async fn remove_marker(&self, index: usize) -> Result<bool, SessionClosed> {
        self.request(|reply| Command::RemoveMarker { index, reply }).await
    }

    pub async fn remove_all_markers(&self) -> Result<(), SessionClosed> {
        self.request(Command::RemoveAll).await
    }

    /// Clears markers, route and cached place names, then locates the user again.
    pub async fn reset(&self) -> Result<(), SessionClosed> {
        self.request(Command::Reset).await
    }

    /// Uses a search result as the current location.
    pub async fn set_searched_location(
        &self,
        coordinate: Coordinate,
    ) -> Result<(), SessionClosed> {
        self.request(|reply| Command::SearchedLocation { coordinate, reply }).await
    }

    pub async fn toggle_location_visibility(&self) -> Result<(), SessionClosed> {
        self.request(Command::ToggleLocationVisibility).await
    }

    pub async fn fly_to(&self, center: Coordinate, zoom: f64) -> Result<(), SessionClosed> {
        let camera = CameraView { center, zoom };
        self.request(|reply| Command::FlyTo { camera, reply }).await
    }

    /// Frames the current route. Returns false when there is none.
    pub async fn fit_route(&self) -> Result<bool, SessionClosed> {
        self.request(Command::FitRoute).await
    }

    pub async fn toggle_layer(&self) -> Result<(), SessionClosed> {
        self.request(Command::ToggleLayer).await
    }

    pub async fn search_locations(
        &self,
        query: &str,
    ) -> Result<Vec<PlaceCandidate>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.services
            .geocoder
            .search_locations(query.to_string(), self.config.search_limit)
            .await
    }

    /// Forecast at the destination marker, or at the user's location when no
    /// destination is placed yet. `None` asks for the configured number of days.
    pub async fn destination_forecast(&self, days: Option<u8>) -> Result<Forecast, ServiceError> {
        let days = days.unwrap_or(self.config.forecast_days);
        let target = {
            let state = self.state.borrow();
            state
                .markers
                .get(1)
                .map(|marker| marker.coordinate)
                .or_else(|| state.location.as_ref().map(|fix| fix.coordinate))
                .unwrap_or(self.config.default_camera.center)
        };
        self.forecast_at(target, days).await
    }

    pub async fn forecast_at(
        &self,
        coordinate: Coordinate,
        days: u8,
    ) -> Result<Forecast, ServiceError> {
        let weather = self
            .services
            .weather
            .as_ref()
            .ok_or(ServiceError::Unconfigured("weather"))?;
        weather.forecast(coordinate, days.max(1)).await
    }

    pub fn state(&self) -> MapState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MapState> {
        self.state.clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionClosed> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionClosed)?;
        answer.await.map_err(|_| SessionClosed)
    }
}
