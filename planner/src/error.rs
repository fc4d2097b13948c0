use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of the platform location API.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a location fix")]
    Timeout,
    #[error("geolocation is not supported on this platform")]
    Unsupported,
    #[error("failed to get your location: {0}")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request to {service} failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned status {status}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("failed to decode {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} returned no results")]
    EmptyResponse(&'static str),
    #[error("no road within snapping radius")]
    NoRoadNearby,
    #[error("{0} service is not configured")]
    Unconfigured(&'static str),
}

/// Reverse lookup failure. Never fatal: callers degrade to coordinate text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("place name lookup for {key} failed: {message}")]
pub struct LookupError {
    pub key: String,
    pub message: String,
}

impl LookupError {
    pub fn new(key: impl Into<String>, err: &ServiceError) -> Self {
        Self {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

/// Both the snapped request and the raw-coordinate retry failed.
#[derive(Debug, Error)]
#[error("route request failed ({primary}); retry with raw coordinates failed ({fallback})")]
pub struct RouteError {
    pub primary: ServiceError,
    pub fallback: ServiceError,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The controller task is gone; the handle can no longer reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("map session has shut down")]
pub struct SessionClosed;
