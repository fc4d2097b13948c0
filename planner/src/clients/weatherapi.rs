use chrono::NaiveDate;
use serde::Deserialize;
use shared::{
    Coordinate, CurrentWeather, Forecast, ForecastDay, ForecastLocation, WeatherCondition,
};

use super::read_json;
use crate::{
    config::{require, ServiceConfig},
    error::{ConfigError, ServiceError},
    services::{BoxFuture, WeatherService},
};

const SERVICE: &str = "weatherapi";

#[derive(Debug, Clone)]
pub struct WeatherApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct RawForecast {
    location: RawLocation,
    current: RawCurrent,
    forecast: RawDays,
}

#[derive(Deserialize)]
struct RawLocation {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    localtime: String,
}

#[derive(Deserialize)]
struct RawCondition {
    text: String,
    icon: String,
}

#[derive(Deserialize)]
struct RawCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: f64,
    wind_kph: f64,
    pressure_mb: f64,
    vis_km: f64,
    uv: f64,
    cloud: f64,
    condition: RawCondition,
}

#[derive(Deserialize)]
struct RawDays {
    #[serde(default)]
    forecastday: Vec<RawDay>,
}

#[derive(Deserialize)]
struct RawDay {
    date: NaiveDate,
    day: RawDaySummary,
    astro: RawAstro,
}

#[derive(Deserialize)]
struct RawDaySummary {
    maxtemp_c: f64,
    mintemp_c: f64,
    condition: RawCondition,
}

#[derive(Deserialize)]
struct RawAstro {
    sunrise: String,
    sunset: String,
}

impl From<RawCondition> for WeatherCondition {
    fn from(raw: RawCondition) -> Self {
        // Icons come back protocol-relative.
        let icon = if raw.icon.starts_with("//") {
            format!("https:{}", raw.icon)
        } else {
            raw.icon
        };
        WeatherCondition {
            text: raw.text,
            icon,
        }
    }
}

impl From<RawForecast> for Forecast {
    fn from(raw: RawForecast) -> Self {
        Forecast {
            location: ForecastLocation {
                name: raw.location.name,
                region: raw.location.region,
                country: raw.location.country,
                localtime: raw.location.localtime,
            },
            current: CurrentWeather {
                temp_c: raw.current.temp_c,
                feelslike_c: raw.current.feelslike_c,
                humidity: raw.current.humidity,
                wind_kph: raw.current.wind_kph,
                pressure_mb: raw.current.pressure_mb,
                vis_km: raw.current.vis_km,
                uv: raw.current.uv,
                cloud: raw.current.cloud,
                condition: raw.current.condition.into(),
            },
            days: raw
                .forecast
                .forecastday
                .into_iter()
                .map(|day| ForecastDay {
                    date: day.date,
                    max_temp_c: day.day.maxtemp_c,
                    min_temp_c: day.day.mintemp_c,
                    condition: day.day.condition.into(),
                    sunrise: day.astro.sunrise,
                    sunset: day.astro.sunset,
                })
                .collect(),
        }
    }
}

impl WeatherApi {
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
        let api_key = require(&config.weather_api_key, "WEATHER_API_KEY")?;
        Ok(Self::new(client, config.weather_base_url.clone(), api_key))
    }

    pub async fn fetch(&self, coordinate: Coordinate, days: u8) -> Result<Forecast, ServiceError> {
        let url = format!("{}/v1/forecast.json", self.base_url);
        let q = format!("{},{}", coordinate.lat, coordinate.lon);
        let days = days.to_string();
        let request = self.client.get(url).query(&[
            ("key", self.api_key.as_str()),
            ("q", q.as_str()),
            ("days", days.as_str()),
            ("aqi", "no"),
            ("alerts", "no"),
        ]);
        let raw: RawForecast = read_json(SERVICE, request).await?;
        Ok(raw.into())
    }
}

impl WeatherService for WeatherApi {
    fn forecast(
        &self,
        coordinate: Coordinate,
        days: u8,
    ) -> BoxFuture<'_, Result<Forecast, ServiceError>> {
        Box::pin(self.fetch(coordinate, days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_relative_icon_gets_https() {
        let condition = WeatherCondition::from(RawCondition {
            text: "Sunny".into(),
            icon: "//cdn.weatherapi.com/weather/64x64/day/113.png".into(),
        });
        assert_eq!(
            condition.icon,
            "https://cdn.weatherapi.com/weather/64x64/day/113.png"
        );

        let absolute = WeatherCondition::from(RawCondition {
            text: "Sunny".into(),
            icon: "https://example.test/113.png".into(),
        });
        assert_eq!(absolute.icon, "https://example.test/113.png");
    }
}
