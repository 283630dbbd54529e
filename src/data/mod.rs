//! Core data models for the environmental dashboard
//!
//! Types shared between the API clients, the cache, and the report printed
//! by the CLI.

pub mod alerts;
pub mod repair;
pub mod weather;

pub use alerts::{AlertClient, AlertError};
pub use weather::{OpenWeatherClient, WeatherError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current weather conditions at a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Location name reported by the provider, if any
    pub city: Option<String>,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    /// Current weather condition
    pub condition: WeatherCondition,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Broad weather condition buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Fog,
}

/// Air quality reading for a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQuality {
    /// Air quality index on the provider's 1 (good) to 5 (very poor) scale
    pub aqi: u8,
    /// Fine particulate matter concentration in µg/m³
    pub pm2_5: f64,
    /// Coarse particulate matter concentration in µg/m³
    pub pm10: f64,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

impl AirQuality {
    /// Human-readable label for the AQI bucket
    pub fn label(&self) -> &'static str {
        match self.aqi {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            5 => "Very Poor",
            _ => "Unknown",
        }
    }
}

/// A geocoded location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
}

/// An environmental alert for the user's current conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoAlert {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub severity: AlertSeverity,
}

/// How urgent an alert is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    #[default]
    Info,
    Watch,
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_snapshot_serialization_roundtrip() {
        let snapshot = WeatherSnapshot {
            city: Some("Vancouver".to_string()),
            temperature: 22.5,
            feels_like: 24.0,
            condition: WeatherCondition::Clouds,
            humidity: 65,
            wind_speed: 3.2,
            fetched_at: Utc::now(),
        };

        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: WeatherSnapshot = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back.city.as_deref(), Some("Vancouver"));
        assert!((back.temperature - 22.5).abs() < 0.01);
        assert_eq!(back.condition, WeatherCondition::Clouds);
        assert_eq!(back.humidity, 65);
    }

    #[test]
    fn test_air_quality_labels() {
        let mut air = AirQuality {
            aqi: 1,
            pm2_5: 5.0,
            pm10: 10.0,
            fetched_at: Utc::now(),
        };
        assert_eq!(air.label(), "Good");
        air.aqi = 3;
        assert_eq!(air.label(), "Moderate");
        air.aqi = 5;
        assert_eq!(air.label(), "Very Poor");
        air.aqi = 9;
        assert_eq!(air.label(), "Unknown");
    }

    #[test]
    fn test_alert_severity_defaults_to_info() {
        let alert: EcoAlert =
            serde_json::from_str(r#"{"title": "t", "description": "d"}"#).expect("parse");
        assert_eq!(alert.severity, AlertSeverity::Info);
    }

    #[test]
    fn test_alert_severity_lowercase_names() {
        let alert: EcoAlert = serde_json::from_str(
            r#"{"title": "t", "description": "d", "severity": "warning"}"#,
        )
        .expect("parse");
        assert_eq!(alert.severity, AlertSeverity::Warning);
    }
}
