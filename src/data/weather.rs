//! OpenWeather API client
//!
//! Fetches current weather, air pollution, and geocoding data from the
//! OpenWeather endpoints and parses the responses into our data structures.
//! All three endpoints count against the same hourly quota; callers go
//! through the fetch orchestrator rather than calling this client directly.

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::{AirQuality, GeoLocation, WeatherCondition, WeatherSnapshot};

/// Base URL for weather and air pollution endpoints
const OPENWEATHER_DATA_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Base URL for the geocoding endpoint
const OPENWEATHER_GEO_URL: &str = "https://api.openweathermap.org/geo/1.0";

/// Errors that can occur when talking to OpenWeather
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// Geocoding found no match for the query
    #[error("Unknown city: {0}")]
    UnknownCity(String),
}

/// Client for the OpenWeather current weather, air pollution, and geocoding
/// endpoints
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    data_base_url: String,
    geo_base_url: String,
}

impl OpenWeatherClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            data_base_url: OPENWEATHER_DATA_URL.to_string(),
            geo_base_url: OPENWEATHER_GEO_URL.to_string(),
        }
    }

    /// Create a client against custom base URLs (for testing)
    #[cfg(test)]
    pub fn with_base_urls(
        api_key: impl Into<String>,
        data_base_url: String,
        geo_base_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            data_base_url,
            geo_base_url,
        }
    }

    /// Fetch current weather conditions for the given coordinates
    pub async fn fetch_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!(
            "{}/weather?lat={}&lon={}&units=metric&appid={}",
            self.data_base_url, lat, lon, self.api_key
        );
        let text = self.get_text(&url).await?;
        let response: CurrentWeatherResponse = serde_json::from_str(&text)?;
        parse_weather(response)
    }

    /// Fetch the current air quality reading for the given coordinates
    pub async fn fetch_air_quality(&self, lat: f64, lon: f64) -> Result<AirQuality, WeatherError> {
        let url = format!(
            "{}/air_pollution?lat={}&lon={}&appid={}",
            self.data_base_url, lat, lon, self.api_key
        );
        let text = self.get_text(&url).await?;
        let response: AirPollutionResponse = serde_json::from_str(&text)?;
        parse_air_quality(response)
    }

    /// Resolve a free-text city name to coordinates
    pub async fn geocode(&self, city: &str) -> Result<GeoLocation, WeatherError> {
        let url = format!(
            "{}/direct?q={}&limit=1&appid={}",
            self.geo_base_url,
            urlencode(city),
            self.api_key
        );
        let text = self.get_text(&url).await?;
        let matches: Vec<GeocodeRecord> = serde_json::from_str(&text)?;
        let record = matches
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::UnknownCity(city.to_string()))?;
        Ok(GeoLocation {
            name: record.name,
            latitude: record.lat,
            longitude: record.lon,
            country: record.country,
        })
    }

    /// Issues a GET and surfaces non-success statuses as errors
    async fn get_text(&self, url: &str) -> Result<String, WeatherError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(WeatherError::ApiStatus {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

/// Parse the current-weather response into a WeatherSnapshot
fn parse_weather(response: CurrentWeatherResponse) -> Result<WeatherSnapshot, WeatherError> {
    let condition_id = response
        .weather
        .first()
        .map(|w| w.id)
        .ok_or_else(|| WeatherError::MissingField("weather".to_string()))?;

    Ok(WeatherSnapshot {
        city: response.name.filter(|n| !n.is_empty()),
        temperature: response.main.temp,
        feels_like: response.main.feels_like,
        condition: condition_id_to_condition(condition_id),
        humidity: response.main.humidity.clamp(0.0, 100.0) as u8,
        wind_speed: response.wind.map(|w| w.speed).unwrap_or(0.0),
        fetched_at: Utc::now(),
    })
}

/// Parse the air-pollution response into an AirQuality reading
fn parse_air_quality(response: AirPollutionResponse) -> Result<AirQuality, WeatherError> {
    let entry = response
        .list
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::MissingField("list".to_string()))?;

    Ok(AirQuality {
        aqi: entry.main.aqi,
        pm2_5: entry.components.pm2_5,
        pm10: entry.components.pm10,
        fetched_at: Utc::now(),
    })
}

/// Map an OpenWeather condition code to a WeatherCondition
///
/// Condition code groups:
/// - 2xx: thunderstorm
/// - 3xx: drizzle
/// - 5xx: rain
/// - 6xx: snow
/// - 7xx: atmosphere (mist, fog, haze, smoke)
/// - 800: clear
/// - 80x: clouds
fn condition_id_to_condition(id: u16) -> WeatherCondition {
    match id {
        200..=299 => WeatherCondition::Thunderstorm,
        300..=399 => WeatherCondition::Drizzle,
        500..=599 => WeatherCondition::Rain,
        600..=699 => WeatherCondition::Snow,
        700..=799 => WeatherCondition::Fog,
        800 => WeatherCondition::Clear,
        _ => WeatherCondition::Clouds,
    }
}

/// Percent-encodes the characters that show up in city names
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' ' => out.push_str("%20"),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(c),
            other => {
                let mut buf = [0u8; 4];
                for byte in other.encode_utf8(&mut buf).as_bytes() {
                    out.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    out
}

/// OpenWeather current-weather response structure
#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    weather: Vec<WeatherEntry>,
    main: MainReadings,
    wind: Option<WindReadings>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WeatherEntry {
    id: u16,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct WindReadings {
    speed: f64,
}

/// OpenWeather air-pollution response structure
#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    main: AirPollutionIndex,
    components: AirPollutionComponents,
}

#[derive(Debug, Deserialize)]
struct AirPollutionIndex {
    aqi: u8,
}

#[derive(Debug, Deserialize)]
struct AirPollutionComponents {
    pm2_5: f64,
    pm10: f64,
}

/// Geocoding response record
#[derive(Debug, Deserialize)]
struct GeocodeRecord {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
}
