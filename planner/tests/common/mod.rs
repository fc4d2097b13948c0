#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::NaiveDate;
use planner::{
    services::{BoxFuture, Directions},
    Geocoder, LocationError, MapConfig, MapController, MapHandle, PositionSource, RoutingService,
    ServiceError, Services, WeatherService,
};
use shared::{
    Coordinate, CurrentWeather, Forecast, ForecastDay, ForecastLocation, LngLat, LocationFix,
    PlaceCandidate, WeatherCondition,
};

pub const A: Coordinate = Coordinate::new(56.95, 24.10);
pub const B: Coordinate = Coordinate::new(56.96, 24.12);
pub const C: Coordinate = Coordinate::new(56.99, 24.20);
pub const HOME: Coordinate = Coordinate::new(56.9496, 24.1052);

/// Latitude shift applied by [`ScriptedRouting`] when snapping.
pub const SNAP_NUDGE: f64 = 0.0003;

pub fn failure() -> ServiceError {
    ServiceError::Status {
        service: "openrouteservice",
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub enum RouteAnswer {
    /// Straight line through the requested points.
    Echo,
    Fail,
    Fixed(Directions),
}

/// Routing double: snaps by nudging latitude, answers routes from a script
/// and falls back to echoing the request once the script runs out.
pub struct ScriptedRouting {
    pub snap_delay: Duration,
    pub route_delay: Duration,
    answers: Mutex<VecDeque<RouteAnswer>>,
    requests: Mutex<Vec<Vec<LngLat>>>,
}

impl ScriptedRouting {
    pub fn new(snap_delay: Duration, route_delay: Duration) -> Self {
        Self {
            snap_delay,
            route_delay,
            answers: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn answering(self, answers: impl IntoIterator<Item = RouteAnswer>) -> Self {
        self.answers.lock().unwrap().extend(answers);
        self
    }

    pub fn requests(&self) -> Vec<Vec<LngLat>> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn echo(points: &[LngLat]) -> Directions {
    Directions {
        geometry: points.to_vec(),
        distance_meters: 2_400.0,
        duration_seconds: 310.0,
    }
}

impl RoutingService for ScriptedRouting {
    fn nearest_road(&self, point: LngLat) -> BoxFuture<'_, Result<LngLat, ServiceError>> {
        Box::pin(async move {
            tokio::time::sleep(self.snap_delay).await;
            Ok(LngLat(point.lng(), point.lat() + SNAP_NUDGE))
        })
    }

    fn route(&self, points: Vec<LngLat>) -> BoxFuture<'_, Result<Directions, ServiceError>> {
        self.requests.lock().unwrap().push(points.clone());
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RouteAnswer::Echo);
        Box::pin(async move {
            tokio::time::sleep(self.route_delay).await;
            match answer {
                RouteAnswer::Echo => Ok(echo(&points)),
                RouteAnswer::Fail => Err(failure()),
                RouteAnswer::Fixed(directions) => Ok(directions),
            }
        })
    }
}

/// Geocoder double counting reverse lookups per coordinate key.
pub struct CountingGeocoder {
    pub delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    searches: Mutex<Vec<(String, usize)>>,
}

impl CountingGeocoder {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Mutex::new(HashMap::new()),
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn calls_for(&self, coordinate: Coordinate) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&coordinate.cache_key())
            .copied()
            .unwrap_or(0)
    }

    pub fn searches(&self) -> Vec<(String, usize)> {
        self.searches.lock().unwrap().clone()
    }
}

pub fn place_name(coordinate: Coordinate) -> String {
    format!("Place {:.2},{:.2}", coordinate.lat, coordinate.lon)
}

impl Geocoder for CountingGeocoder {
    fn search_locations(
        &self,
        query: String,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<PlaceCandidate>, ServiceError>> {
        self.searches.lock().unwrap().push((query.clone(), limit));
        Box::pin(async move {
            Ok(vec![PlaceCandidate {
                formatted: format!("{query}, Latvia"),
                coordinate: C,
                country: Some("Latvia".into()),
            }])
        })
    }

    fn place_name(&self, coordinate: Coordinate) -> BoxFuture<'_, Result<String, ServiceError>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(coordinate.cache_key())
            .or_default() += 1;
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(place_name(coordinate))
        })
    }
}

/// Position double replaying scripted outcomes, then reporting [`HOME`].
pub struct ScriptedPosition {
    pub delay: Duration,
    outcomes: Mutex<VecDeque<Result<LocationFix, LocationError>>>,
    calls: Mutex<usize>,
}

impl ScriptedPosition {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    pub fn then(self, outcome: Result<LocationFix, LocationError>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl PositionSource for ScriptedPosition {
    fn current_position(&self) -> BoxFuture<'_, Result<LocationFix, LocationError>> {
        *self.calls.lock().unwrap() += 1;
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(LocationFix::at(HOME)));
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            outcome
        })
    }
}

/// Weather double recording where forecasts were asked for.
#[derive(Default)]
pub struct StaticWeather {
    requests: Mutex<Vec<(Coordinate, u8)>>,
}

impl StaticWeather {
    pub fn requests(&self) -> Vec<(Coordinate, u8)> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn sample_forecast() -> Forecast {
    let sunny = WeatherCondition {
        text: "Sunny".into(),
        icon: "https://cdn.weatherapi.com/weather/64x64/day/113.png".into(),
    };
    Forecast {
        location: ForecastLocation {
            name: "Riga".into(),
            region: "Riga".into(),
            country: "Latvia".into(),
            localtime: "2026-06-01 12:00".into(),
        },
        current: CurrentWeather {
            temp_c: 21.0,
            feelslike_c: 20.5,
            humidity: 48.0,
            wind_kph: 11.2,
            pressure_mb: 1016.0,
            vis_km: 10.0,
            uv: 5.0,
            cloud: 10.0,
            condition: sunny.clone(),
        },
        days: vec![ForecastDay {
            date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            max_temp_c: 23.0,
            min_temp_c: 12.0,
            condition: sunny,
            sunrise: "04:31 AM".into(),
            sunset: "10:12 PM".into(),
        }],
    }
}

impl WeatherService for StaticWeather {
    fn forecast(
        &self,
        coordinate: Coordinate,
        days: u8,
    ) -> BoxFuture<'_, Result<Forecast, ServiceError>> {
        self.requests.lock().unwrap().push((coordinate, days));
        Box::pin(async { Ok(sample_forecast()) })
    }
}

pub struct Session {
    pub handle: MapHandle,
    pub routing: Arc<ScriptedRouting>,
    pub geocoder: Arc<CountingGeocoder>,
    pub position: Arc<ScriptedPosition>,
    pub weather: Arc<StaticWeather>,
}

pub fn session(
    routing: ScriptedRouting,
    geocoder: CountingGeocoder,
    position: ScriptedPosition,
) -> Session {
    let routing = Arc::new(routing);
    let geocoder = Arc::new(geocoder);
    let position = Arc::new(position);
    let weather = Arc::new(StaticWeather::default());
    let services = Services::new(geocoder.clone(), routing.clone(), position.clone())
        .with_weather(weather.clone());
    Session {
        handle: MapController::spawn(MapConfig::default(), services),
        routing,
        geocoder,
        position,
        weather,
    }
}

/// Session whose collaborators all answer immediately.
pub fn instant_session() -> Session {
    session(
        ScriptedRouting::instant(),
        CountingGeocoder::new(Duration::ZERO),
        ScriptedPosition::new(Duration::ZERO),
    )
}

/// Lets spawned work finish. Only meaningful with a paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn near(a: Coordinate, b: Coordinate) -> bool {
    planner::geodesy::haversine_km(a, b) < 0.05
}
