//! TTL response cache for external API payloads
//!
//! Stores JSON payloads keyed by strings derived from the request's semantic
//! inputs, with a 10-minute freshness window. Entries are mirrored to disk so
//! a restart within the TTL reuses them instead of spending quota.
//!
//! Key construction deliberately rounds coordinates to 3 decimal places
//! (roughly 100 m), so nearby lookups share a cache slot. This trades
//! precision for hit rate; weather and air quality do not vary at that scale.

mod store;

pub use store::{ResponseCache, DEFAULT_TTL};

/// Cache key for a current-weather lookup at rounded coordinates
pub fn weather_key(lat: f64, lon: f64) -> String {
    format!("weather_{:.3}_{:.3}", lat, lon)
}

/// Cache key for an air-quality lookup at rounded coordinates
pub fn air_quality_key(lat: f64, lon: f64) -> String {
    format!("air_{:.3}_{:.3}", lat, lon)
}

/// Cache key for a city geocoding lookup
pub fn geocode_key(city: &str) -> String {
    let normalized = city
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    format!("geocode_{}", normalized)
}

/// Cache key for generated alerts, composed from the metrics the prompt uses.
///
/// Equal inputs produce equal prompts, so the cached alert set is still the
/// semantically correct answer.
pub fn alerts_key(temperature: f64, humidity: u8, aqi: u8) -> String {
    format!("alerts_{:.0}_{}_{}", temperature, humidity, aqi)
}
