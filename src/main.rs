//! ecodash - local weather, air quality and environmental alerts
//!
//! Fetches current conditions for a coordinate pair or city and prints a
//! plain-text report. All outbound API calls go through a shared response
//! cache and hourly quota tracker so repeated runs stay within the weather
//! provider's free tier.

use std::env;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ecodash::cache::{self, ResponseCache, DEFAULT_TTL};
use ecodash::cli::{Cli, Location, StartupConfig};
use ecodash::data::alerts::default_alerts;
use ecodash::data::{
    AirQuality, AlertClient, EcoAlert, GeoLocation, OpenWeatherClient, WeatherSnapshot,
};
use ecodash::fetch::{FetchError, FetchOrchestrator};
use ecodash::limiter::{ApiService, QuotaLimits, QuotaTracker, EXEMPT_REMAINING};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    // Composition root: the cache, quota tracker and orchestrator are built
    // once here and shared by reference, never reached through globals.
    let quota = Arc::new(QuotaTracker::new(QuotaLimits::from_env()));
    let cache_store = Arc::new(ResponseCache::persistent(DEFAULT_TTL));
    let orchestrator = FetchOrchestrator::new(cache_store, Arc::clone(&quota));

    if config.show_quota {
        print_quota_status(&quota);
        return Ok(());
    }

    let Ok(weather_api_key) = env::var("OPENWEATHER_API_KEY") else {
        eprintln!("OPENWEATHER_API_KEY is not set.");
        process::exit(2);
    };
    let weather_client = OpenWeatherClient::new(weather_api_key);

    // Validation guarantees a location whenever show_quota is false
    let Some(location) = config.location.clone() else {
        eprintln!("No location given.");
        process::exit(2);
    };
    let (lat, lon, place) = match resolve_location(&orchestrator, &weather_client, &location).await
    {
        Ok(resolved) => resolved,
        Err(e) => {
            report_fetch_error(&e);
            process::exit(1);
        }
    };

    let weather_key = cache::weather_key(lat, lon);
    let air_key = cache::air_quality_key(lat, lon);
    let weather_fut = orchestrator.fetch(
        ApiService::OpenWeather,
        &weather_key,
        config.force_refresh,
        || weather_client.fetch_weather(lat, lon),
    );
    let air_fut = orchestrator.fetch(
        ApiService::OpenWeather,
        &air_key,
        config.force_refresh,
        || weather_client.fetch_air_quality(lat, lon),
    );
    let (weather, air) = match futures::join!(weather_fut, air_fut) {
        (Ok(weather), Ok(air)) => (weather, air),
        (Err(e), _) | (_, Err(e)) => {
            report_fetch_error(&e);
            process::exit(1);
        }
    };

    let alerts = if config.skip_alerts {
        None
    } else {
        Some(fetch_alerts(&orchestrator, &config, &weather, &air).await)
    };

    print_report(&place, &weather, &air, alerts.as_deref());
    Ok(())
}

/// Resolves the configured location to coordinates, geocoding a city name
/// through the orchestrator so lookups are cached and quota-limited too.
async fn resolve_location(
    orchestrator: &FetchOrchestrator,
    client: &OpenWeatherClient,
    location: &Location,
) -> Result<(f64, f64, String), FetchError<ecodash::data::WeatherError>> {
    match location {
        Location::Coordinates { lat, lon } => {
            Ok((*lat, *lon, format!("{:.3}, {:.3}", lat, lon)))
        }
        Location::City(city) => {
            let geo: GeoLocation = orchestrator
                .fetch(
                    ApiService::OpenWeather,
                    &cache::geocode_key(city),
                    false,
                    || client.geocode(city),
                )
                .await?;
            let place = match &geo.country {
                Some(country) => format!("{}, {}", geo.name, country),
                None => geo.name.clone(),
            };
            Ok((geo.latitude, geo.longitude, place))
        }
    }
}

/// Generates alerts, degrading to the hardcoded defaults when the provider
/// is unavailable, unconfigured, or returns something unparseable.
async fn fetch_alerts(
    orchestrator: &FetchOrchestrator,
    config: &StartupConfig,
    weather: &WeatherSnapshot,
    air: &AirQuality,
) -> Vec<EcoAlert> {
    let Ok(gemini_api_key) = env::var("GEMINI_API_KEY") else {
        warn!("GEMINI_API_KEY is not set, using default alerts");
        return default_alerts();
    };
    let alert_client = AlertClient::new(gemini_api_key);

    let key = cache::alerts_key(weather.temperature, weather.humidity, air.aqi);
    match orchestrator
        .fetch(ApiService::Gemini, &key, config.force_refresh, || {
            alert_client.generate_alerts(weather, air)
        })
        .await
    {
        Ok(alerts) if !alerts.is_empty() => alerts,
        Ok(_) => default_alerts(),
        Err(e) => {
            warn!(error = %e, "alert generation failed, using default alerts");
            default_alerts()
        }
    }
}

/// Prints a user-facing message for a failed orchestrated fetch
fn report_fetch_error<E: std::error::Error + 'static>(error: &FetchError<E>) {
    match error {
        FetchError::QuotaExceeded { retry_after, .. } => {
            let minutes = (retry_after.as_secs() + 59) / 60;
            eprintln!(
                "Weather lookups are temporarily limited. Try again in about {} minute{}.",
                minutes,
                if minutes == 1 { "" } else { "s" }
            );
        }
        FetchError::DuplicateRequest => {
            eprintln!("An identical request is already running.");
        }
        FetchError::Upstream(e) => {
            eprintln!("Could not fetch conditions: {e}");
        }
    }
}

fn print_quota_status(quota: &QuotaTracker) {
    let remaining = quota.remaining(ApiService::OpenWeather);
    println!("Weather API calls remaining this hour: {remaining}");
    let reset = quota.time_until_reset(ApiService::OpenWeather);
    if !reset.is_zero() {
        println!("Window resets in {} s", reset.as_secs());
    }
    let gemini = quota.remaining(ApiService::Gemini);
    if gemini == EXEMPT_REMAINING {
        println!("Alert generation: unlimited");
    }
}

fn print_report(
    place: &str,
    weather: &WeatherSnapshot,
    air: &AirQuality,
    alerts: Option<&[EcoAlert]>,
) {
    let name = weather.city.as_deref().unwrap_or(place);
    println!("Conditions for {name}");
    println!(
        "  {:?}, {:.1}°C (feels like {:.1}°C)",
        weather.condition, weather.temperature, weather.feels_like
    );
    println!(
        "  Humidity {}%  Wind {:.1} m/s",
        weather.humidity, weather.wind_speed
    );
    println!(
        "  Air quality: {} (AQI {})  PM2.5 {:.1} µg/m³",
        air.label(),
        air.aqi,
        air.pm2_5
    );

    if let Some(alerts) = alerts {
        println!();
        println!("Alerts:");
        for alert in alerts {
            println!("  [{:?}] {} - {}", alert.severity, alert.title, alert.description);
        }
    }
}
