//! Sliding-window call tracking for external API services
//!
//! Keeps a per-service log of call timestamps and answers "can I call now?"
//! against a configured hourly ceiling. Entries older than the trailing hour
//! are ignored on every read and pruned on every write, so memory stays
//! bounded for the life of the process.

use std::collections::HashMap;
use std::env;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::warn;

/// Length of the sliding quota window.
const WINDOW_SECS: i64 = 3600;

/// Remaining-call count reported for services exempt from throttling.
pub const EXEMPT_REMAINING: u32 = u32::MAX;

/// Environment variable overriding the weather service's hourly ceiling.
const WEATHER_CEILING_ENV: &str = "ECODASH_WEATHER_CALLS_PER_HOUR";

/// The external services this crate talks to.
///
/// A closed enum rather than free-form service names: an unknown service is a
/// compile error, not a silently unthrottled string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiService {
    /// Weather, air quality and geocoding endpoints (throttled)
    OpenWeather,
    /// Alert text generation (exempt from client-side throttling)
    Gemini,
}

impl ApiService {
    /// Short identifier used in log lines and error messages
    pub fn name(&self) -> &'static str {
        match self {
            ApiService::OpenWeather => "openweather",
            ApiService::Gemini => "gemini",
        }
    }
}

/// Per-service hourly ceilings.
///
/// `Gemini` carries no ceiling: its provider-side free tier is generous
/// enough that client-side throttling would only get in the way.
#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    /// Maximum calls per hour against the weather/geocoding service
    pub weather_calls_per_hour: u32,
}

impl QuotaLimits {
    /// Default hourly ceiling for the weather/geocoding service
    pub const DEFAULT_WEATHER_CALLS_PER_HOUR: u32 = 12;

    /// Reads limits from the environment.
    ///
    /// `ECODASH_WEATHER_CALLS_PER_HOUR` overrides the weather ceiling. A
    /// missing or unparseable value falls back to the default of 12, never to
    /// unlimited or zero.
    pub fn from_env() -> Self {
        let weather_calls_per_hour = match env::var(WEATHER_CEILING_ENV) {
            Ok(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(value = %raw, "ignoring invalid ECODASH_WEATHER_CALLS_PER_HOUR");
                    Self::DEFAULT_WEATHER_CALLS_PER_HOUR
                }
            },
            Err(_) => Self::DEFAULT_WEATHER_CALLS_PER_HOUR,
        };
        Self {
            weather_calls_per_hour,
        }
    }

    /// Ceiling for a service, `None` when the service is exempt
    fn ceiling(&self, service: ApiService) -> Option<u32> {
        match service {
            ApiService::OpenWeather => Some(self.weather_calls_per_hour),
            ApiService::Gemini => None,
        }
    }
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            weather_calls_per_hour: Self::DEFAULT_WEATHER_CALLS_PER_HOUR,
        }
    }
}

/// Tracks calls per service over the trailing hour.
///
/// Constructed once at startup and shared via `Arc`; never a module-level
/// global, so tests get isolated instances. The call log is behind a mutex
/// because the orchestrator's check-then-record sequence runs on a
/// multi-threaded runtime.
#[derive(Debug)]
pub struct QuotaTracker {
    limits: QuotaLimits,
    call_log: Mutex<HashMap<ApiService, Vec<DateTime<Utc>>>>,
}

impl QuotaTracker {
    pub fn new(limits: QuotaLimits) -> Self {
        Self {
            limits,
            call_log: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if a call to `service` is allowed right now.
    ///
    /// Never fails: an exempt service is always allowed, and the check only
    /// counts entries inside the trailing hour.
    pub fn can_call(&self, service: ApiService) -> bool {
        self.can_call_at(service, Utc::now())
    }

    /// `can_call` against an explicit clock reading (used by tests)
    pub fn can_call_at(&self, service: ApiService, now: DateTime<Utc>) -> bool {
        match self.limits.ceiling(service) {
            None => true,
            Some(max) => self.live_count(service, now) < max,
        }
    }

    /// Records a dispatched call against `service`.
    ///
    /// Callers must record only after a successful dispatch; recording before
    /// checking `can_call` is a caller bug. Pruning happens here so the log
    /// never grows past one hour of traffic.
    pub fn record_call(&self, service: ApiService) {
        self.record_call_at(service, Utc::now());
    }

    /// `record_call` against an explicit clock reading (used by tests)
    pub fn record_call_at(&self, service: ApiService, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(WINDOW_SECS);
        let mut log = self.call_log.lock();
        let entries = log.entry(service).or_default();
        entries.push(now);
        entries.retain(|t| *t > cutoff);
    }

    /// Calls still available in the current window (sentinel for exempt services)
    pub fn remaining(&self, service: ApiService) -> u32 {
        self.remaining_at(service, Utc::now())
    }

    /// `remaining` against an explicit clock reading (used by tests)
    pub fn remaining_at(&self, service: ApiService, now: DateTime<Utc>) -> u32 {
        match self.limits.ceiling(service) {
            None => EXEMPT_REMAINING,
            Some(max) => max.saturating_sub(self.live_count(service, now)),
        }
    }

    /// Time until the oldest live entry leaves the window (zero when idle)
    pub fn time_until_reset(&self, service: ApiService) -> StdDuration {
        self.time_until_reset_at(service, Utc::now())
    }

    /// `time_until_reset` against an explicit clock reading (used by tests)
    pub fn time_until_reset_at(&self, service: ApiService, now: DateTime<Utc>) -> StdDuration {
        let cutoff = now - Duration::seconds(WINDOW_SECS);
        let log = self.call_log.lock();
        let oldest_live = log
            .get(&service)
            .and_then(|entries| entries.iter().filter(|t| **t > cutoff).min().copied());
        match oldest_live {
            Some(t) => (t + Duration::seconds(WINDOW_SECS) - now)
                .to_std()
                .unwrap_or_default(),
            None => StdDuration::ZERO,
        }
    }

    /// Number of calls inside the trailing window
    fn live_count(&self, service: ApiService, now: DateTime<Utc>) -> u32 {
        let cutoff = now - Duration::seconds(WINDOW_SECS);
        let log = self.call_log.lock();
        log.get(&service)
            .map(|entries| entries.iter().filter(|t| **t > cutoff).count() as u32)
            .unwrap_or(0)
    }
}
