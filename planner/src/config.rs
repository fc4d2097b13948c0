use std::{num::NonZeroUsize, time::Duration};

use shared::{CameraView, Coordinate};

use crate::error::ConfigError;

pub const DEFAULT_ORS_BASE_URL: &str = "https://api.openrouteservice.org";
pub const DEFAULT_OPENCAGE_BASE_URL: &str = "https://api.opencagedata.com";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.weatherapi.com";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PLACE_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(capacity) => capacity,
    None => panic!("cache capacity must be non-zero"),
};

/// Timings and defaults of a map session.
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub default_camera: CameraView,
    /// How long map clicks are ignored after a removal, reset or location restore.
    pub click_gate: Duration,
    pub route_error_ttl: Duration,
    pub location_timeout: Duration,
    pub place_cache_capacity: NonZeroUsize,
    pub search_limit: usize,
    pub forecast_days: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_camera: CameraView::default(),
            click_gate: Duration::from_millis(400),
            route_error_ttl: Duration::from_secs(5),
            location_timeout: Duration::from_secs(10),
            place_cache_capacity: DEFAULT_PLACE_CACHE_CAPACITY,
            search_limit: 7,
            forecast_days: 3,
        }
    }
}

/// API keys and endpoints of the third-party services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub ors_api_key: Option<String>,
    pub opencage_api_key: Option<String>,
    pub weather_api_key: Option<String>,
    pub ors_base_url: String,
    pub opencage_base_url: String,
    pub weather_base_url: String,
    pub http_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let base_url = |name: &str, default: &str| {
            non_empty(name)
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };

        let http_timeout = match non_empty("HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                    name: "HTTP_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            ors_api_key: non_empty("ORS_API_KEY"),
            opencage_api_key: non_empty("OPENCAGE_API_KEY"),
            weather_api_key: non_empty("WEATHER_API_KEY"),
            ors_base_url: base_url("ORS_BASE_URL", DEFAULT_ORS_BASE_URL),
            opencage_base_url: base_url("OPENCAGE_BASE_URL", DEFAULT_OPENCAGE_BASE_URL),
            weather_base_url: base_url("WEATHER_BASE_URL", DEFAULT_WEATHER_BASE_URL),
            http_timeout,
        })
    }

    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("planner/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}

pub(crate) fn require<'a>(
    value: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::Missing(name))
}

/// Parses `"lat,lon"` as typed on the command line.
pub fn parse_coordinate(raw: &str) -> Result<Coordinate, String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON but got {raw:?}"))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid latitude {lat:?}"))?;
    let lon = lon
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid longitude {lon:?}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinate out of range: {lat},{lon}"));
    }
    Ok(Coordinate { lat, lon })
}
