use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default camera center used until a location fix is available (Riga).
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: 56.946285,
    lon: 24.105078,
};
pub const DEFAULT_ZOOM: f64 = 13.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    /// Stable key used to memoize reverse lookups.
    pub fn cache_key(self) -> String {
        format!("{:.5},{:.5}", self.lat, self.lon)
    }

    /// Human readable fallback when no place name is known.
    pub fn display(self) -> String {
        format!("{:.5}, {:.5}", self.lat, self.lon)
    }

    pub fn to_lng_lat(self) -> LngLat {
        LngLat(self.lon, self.lat)
    }
}

/// A position in `[longitude, latitude]` order, as routing APIs expect it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat(pub f64, pub f64);

impl LngLat {
    pub fn lng(self) -> f64 {
        self.0
    }

    pub fn lat(self) -> f64 {
        self.1
    }

    pub fn to_coordinate(self) -> Coordinate {
        Coordinate {
            lat: self.1,
            lon: self.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerOrder {
    Origin,
    Destination,
}

impl MarkerOrder {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Origin),
            1 => Some(Self::Destination),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Origin => 0,
            Self::Destination => 1,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Origin => "Start (A)",
            Self::Destination => "Destination (B)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub order: MarkerOrder,
}

impl Marker {
    /// Label if resolved, otherwise the raw coordinates.
    pub fn caption(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.coordinate.display())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl LocationFix {
    pub fn at(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            accuracy: None,
            hidden: false,
            label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub geometry: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl RouteResult {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Idle,
    Snapping,
    Fetching,
    Fallback,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub formatted: String,
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub center: Coordinate,
    pub zoom: f64,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapLayer {
    #[default]
    Street,
    Satellite,
}

impl MapLayer {
    pub fn toggled(self) -> Self {
        match self {
            Self::Street => Self::Satellite,
            Self::Satellite => Self::Street,
        }
    }
}

/// Transient route error shown to the user until it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteBanner {
    pub id: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub text: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastLocation {
    pub name: String,
    pub region: String,
    pub country: String,
    pub localtime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temp_c: f64,
    pub feelslike_c: f64,
    pub humidity: f64,
    pub wind_kph: f64,
    pub pressure_mb: f64,
    pub vis_km: f64,
    pub uv: f64,
    pub cloud: f64,
    pub condition: WeatherCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub condition: WeatherCondition,
    pub sunrise: String,
    pub sunset: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: ForecastLocation,
    pub current: CurrentWeather,
    pub days: Vec<ForecastDay>,
}
