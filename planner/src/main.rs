use std::sync::Arc;

use clap::{Parser, Subcommand};
use planner::{
    clients::{services_from_config, OpenCage, WeatherApi},
    config::parse_coordinate,
    ClickOrigin, ClickOutcome, FixedPosition, MapConfig, MapController, MapState,
    NoPositionSource, PositionSource, ServiceConfig,
};
use shared::{Coordinate, Forecast, QueryStatus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Driving routes, place search and forecasts from the command line"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Place start and destination markers and print the resolved route
    Route {
        /// Start marker as LAT,LON
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        from: Coordinate,
        /// Destination marker as LAT,LON
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        to: Coordinate,
        /// Report this position as the user's location
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        here: Option<Coordinate>,
        /// Print the final map state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up places matching a free-text query
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the forecast at a coordinate
    Weather {
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        at: Coordinate,
        /// Days of forecast, defaults to the map session setting
        #[arg(long)]
        days: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = ServiceConfig::from_env()?;

    match args.command {
        Command::Route {
            from,
            to,
            here,
            json,
        } => {
            let position: Arc<dyn PositionSource> = match here {
                Some(coordinate) => Arc::new(FixedPosition(coordinate)),
                None => Arc::new(NoPositionSource),
            };
            let services = services_from_config(&config, position)?;
            let handle = MapController::spawn(MapConfig::default(), services);

            for point in [from, to] {
                match handle.on_map_click(point, ClickOrigin::Map).await? {
                    ClickOutcome::Placed(_) => {}
                    other => {
                        let message =
                            format!("marker at {} not placed: {other:?}", point.display());
                        return Err(message.into());
                    }
                }
            }

            let state = handle
                .subscribe()
                .wait_for(|state| {
                    matches!(state.route_status, QueryStatus::Succeeded | QueryStatus::Failed)
                        && state.markers.iter().all(|marker| marker.label.is_some())
                        && !state.loading
                })
                .await?
                .clone();

            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_route(&state);
            }
            if let Some(banner) = &state.route_error {
                return Err(banner.message.clone().into());
            }
        }
        Command::Search { query, json } => {
            let geocoder = OpenCage::from_config(&config, config.http_client()?)?;
            let candidates = geocoder
                .search(&query, MapConfig::default().search_limit)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else if candidates.is_empty() {
                println!("no places match {query:?}");
            } else {
                for candidate in &candidates {
                    println!("{}  ({})", candidate.formatted, candidate.coordinate.display());
                }
            }
        }
        Command::Weather { at, days } => {
            let weather = WeatherApi::from_config(&config, config.http_client()?)?;
            let days = days.unwrap_or(MapConfig::default().forecast_days);
            let forecast = weather.fetch(at, days.max(1)).await?;
            print_forecast(&forecast);
        }
    }

    Ok(())
}

fn print_route(state: &MapState) {
    for marker in &state.markers {
        println!("{}: {}", marker.order.title(), marker.caption());
    }
    if let Some(fix) = state.visible_location() {
        let label = fix.label.clone().unwrap_or_else(|| fix.coordinate.display());
        println!("You are here: {label}");
    }
    match &state.route {
        Some(route) => println!(
            "Distance: {:.1} km, duration: {:.0} min ({} points)",
            route.distance_km(),
            route.duration_minutes(),
            route.geometry.len()
        ),
        None => {
            if let Some(banner) = &state.route_error {
                println!("{}", banner.message);
            }
        }
    }
}

fn print_forecast(forecast: &Forecast) {
    let place = &forecast.location;
    println!("{}, {}, {} ({})", place.name, place.region, place.country, place.localtime);
    let now = &forecast.current;
    println!(
        "Now: {:.1}°C (feels like {:.1}°C), {}",
        now.temp_c, now.feelslike_c, now.condition.text
    );
    println!(
        "Humidity {:.0}%, wind {:.1} km/h, pressure {:.0} mb, visibility {:.1} km, UV {:.1}, cloud {:.0}%",
        now.humidity, now.wind_kph, now.pressure_mb, now.vis_km, now.uv, now.cloud
    );
    for day in &forecast.days {
        println!(
            "{}: {:.1}°C / {:.1}°C, {} (sunrise {}, sunset {})",
            day.date.format("%a %d %b"),
            day.min_temp_c,
            day.max_temp_c,
            day.condition.text,
            day.sunrise,
            day.sunset
        );
    }
}
