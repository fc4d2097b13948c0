//! reqwest implementations of the collaborator traits.

mod opencage;
mod openroute;
mod weatherapi;

use std::sync::Arc;

use serde::de::DeserializeOwned;

pub use opencage::OpenCage;
pub use openroute::OpenRouteService;
pub use weatherapi::WeatherApi;

use crate::{
    config::ServiceConfig,
    error::{ConfigError, ServiceError},
    services::{PositionSource, Services},
};

/// Wires the HTTP clients for a map session. Routing and geocoding keys are
/// required; weather is attached only when its key is set.
pub fn services_from_config(
    config: &ServiceConfig,
    position: Arc<dyn PositionSource>,
) -> Result<Services, ConfigError> {
    let client = config.http_client()?;
    let services = Services::new(
        Arc::new(OpenCage::from_config(config, client.clone())?),
        Arc::new(OpenRouteService::from_config(config, client.clone())?),
        position,
    );
    Ok(match WeatherApi::from_config(config, client) {
        Ok(weather) => services.with_weather(Arc::new(weather)),
        Err(err) => {
            tracing::info!("weather forecasts disabled: {err}");
            services
        }
    })
}

/// Sends `request` and decodes a JSON body, mapping each failure to the
/// service it came from.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, ServiceError> {
    let response = request
        .send()
        .await
        .map_err(|source| ServiceError::Http { service, source })?;
    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::Status { service, status });
    }
    let body = response
        .bytes()
        .await
        .map_err(|source| ServiceError::Http { service, source })?;
    serde_json::from_slice(&body).map_err(|source| ServiceError::Decode { service, source })
}
