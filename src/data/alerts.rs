//! AI-generated environmental alerts
//!
//! Sends the current weather and air-quality metrics to the Gemini
//! `generateContent` endpoint and decodes the reply into a list of
//! [`EcoAlert`]s. The provider answers in free text, so the reply goes
//! through the repair step in [`crate::data::repair`] before parsing.
//!
//! Alert generation is decorative: when anything goes wrong the caller
//! shows [`default_alerts`] instead of an error.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::repair::repair_json;
use super::{AirQuality, AlertSeverity, EcoAlert, WeatherSnapshot};

/// Gemini content-generation endpoint
const GEMINI_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Errors that can occur when generating alerts
#[derive(Debug, Error)]
pub enum AlertError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// The response carried no candidate text at all
    #[error("response contained no generated text")]
    EmptyResponse,

    /// The generated text held no parseable JSON block even after repair
    #[error("could not extract alerts from generated text: {0}")]
    MalformedResponse(String),
}

/// Client for generating environmental alerts from current conditions
#[derive(Debug, Clone)]
pub struct AlertClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlertClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Create a client against a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(api_key: impl Into<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url,
        }
    }

    /// Generate alerts for the given conditions
    pub async fn generate_alerts(
        &self,
        weather: &WeatherSnapshot,
        air: &AirQuality,
    ) -> Result<Vec<EcoAlert>, AlertError> {
        let prompt = build_prompt(weather, air);
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let url = format!("{}?key={}", self.base_url, self.api_key);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AlertError::ApiStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let generated = extract_candidate_text(&text)?;
        debug!(chars = generated.len(), "received generated alert text");
        parse_alerts(&generated)
    }
}

/// Builds the generation prompt from the current metrics
fn build_prompt(weather: &WeatherSnapshot, air: &AirQuality) -> String {
    format!(
        "Current conditions: temperature {:.1}C (feels like {:.1}C), humidity {}%, \
         wind {:.1} m/s, air quality index {} ({}), PM2.5 {:.1} ug/m3. \
         Produce up to 3 short environmental alerts for a resident, as a JSON array of \
         objects with fields \"title\", \"description\" and \"severity\" \
         (one of \"info\", \"watch\", \"warning\"). Reply with only the JSON array.",
        weather.temperature,
        weather.feels_like,
        weather.humidity,
        weather.wind_speed,
        air.aqi,
        air.label(),
        air.pm2_5,
    )
}

/// Pulls the first candidate's text out of a generateContent response
fn extract_candidate_text(raw: &str) -> Result<String, AlertError> {
    let response: GenerateContentResponse =
        serde_json::from_str(raw).map_err(|e| AlertError::MalformedResponse(e.to_string()))?;
    response
        .candidates
        .into_iter()
        .flat_map(|c| c.content.parts)
        .map(|p| p.text)
        .next()
        .filter(|t| !t.trim().is_empty())
        .ok_or(AlertError::EmptyResponse)
}

/// Decodes generated text into alerts, accepting either a bare array or an
/// object wrapping an `alerts` array
fn parse_alerts(generated: &str) -> Result<Vec<EcoAlert>, AlertError> {
    let repaired = repair_json(generated)
        .ok_or_else(|| AlertError::MalformedResponse("no JSON block found".to_string()))?;

    if let Ok(alerts) = serde_json::from_str::<Vec<EcoAlert>>(&repaired) {
        return Ok(alerts);
    }
    serde_json::from_str::<AlertEnvelope>(&repaired)
        .map(|envelope| envelope.alerts)
        .map_err(|e| AlertError::MalformedResponse(e.to_string()))
}

/// Hardcoded alerts shown when generation fails or is disabled.
///
/// Deliberately generic: graceful degradation is preferred over surfacing an
/// AI provider error to the end user.
pub fn default_alerts() -> Vec<EcoAlert> {
    vec![
        EcoAlert {
            title: "Check local air quality".to_string(),
            description: "Air quality can shift quickly; sensitive groups should check \
                          readings before prolonged outdoor activity."
                .to_string(),
            severity: AlertSeverity::Info,
        },
        EcoAlert {
            title: "Save energy at peak hours".to_string(),
            description: "Shifting heavy appliance use away from early evening reduces \
                          grid load and emissions."
                .to_string(),
            severity: AlertSeverity::Info,
        },
    ]
}

/// Wrapper shape some generations use instead of a bare array
#[derive(Debug, Deserialize)]
struct AlertEnvelope {
    alerts: Vec<EcoAlert>,
}

/// Gemini generateContent response structure
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}
