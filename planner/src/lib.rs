pub mod click_gate;
pub mod clients;
pub mod config;
pub mod controller;
pub mod error;
pub mod geodesy;
pub mod geolocation;
mod inflight;
pub mod markers;
pub mod place_names;
pub mod resolver;
pub mod services;
pub mod state;

pub use config::{MapConfig, ServiceConfig};
pub use controller::{ClickOrigin, ClickOutcome, MapController, MapHandle};
pub use error::{ConfigError, LocationError, LookupError, RouteError, ServiceError, SessionClosed};
pub use services::{
    FixedPosition, Geocoder, NoPositionSource, PositionSource, RoutingService, Services,
    WeatherService,
};
pub use state::MapState;
