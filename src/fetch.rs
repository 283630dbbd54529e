//! Fetch orchestration: cache, quota, and duplicate suppression
//!
//! `FetchOrchestrator` wraps every outbound API call. It serves fresh cached
//! payloads without touching the network, refuses calls that would blow the
//! hourly quota, and drops a second concurrent request for the same derived
//! identity instead of queueing it. The in-flight marker is held by a drop
//! guard, so it is cleared on every exit path including fetch failures.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::limiter::{ApiService, QuotaTracker};

/// Failure modes of an orchestrated fetch.
///
/// Generic over the upstream client's error type so each client keeps its own
/// error taxonomy; upstream failures pass through untouched and are never
/// cached.
#[derive(Debug, Error)]
pub enum FetchError<E>
where
    E: std::error::Error + 'static,
{
    /// The hourly ceiling for the service is exhausted; no call was made
    #[error("hourly quota for {service} exhausted, retry in {}s", .retry_after.as_secs())]
    QuotaExceeded {
        service: &'static str,
        retry_after: StdDuration,
    },

    /// An identical request is already in flight; this one was dropped
    #[error("an identical request is already in flight")]
    DuplicateRequest,

    /// The underlying network call failed
    #[error(transparent)]
    Upstream(E),
}

impl<E: std::error::Error + 'static> FetchError<E> {
    /// True when the caller should surface a "temporarily limited" message
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, FetchError::QuotaExceeded { .. })
    }
}

/// Composes the response cache and quota tracker around network fetches.
pub struct FetchOrchestrator {
    cache: Arc<ResponseCache>,
    quota: Arc<QuotaTracker>,
    in_flight: Mutex<HashSet<String>>,
}

/// Clears the in-flight marker when the orchestrated call finishes,
/// regardless of outcome.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    key: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(self.key);
    }
}

impl FetchOrchestrator {
    pub fn new(cache: Arc<ResponseCache>, quota: Arc<QuotaTracker>) -> Self {
        Self {
            cache,
            quota,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Fetches the payload for `key`, preferring the cache.
    ///
    /// The cache key doubles as the request identity for duplicate
    /// suppression: it is already derived from the call's semantic inputs.
    ///
    /// # Behavior
    /// - A fresh cached payload is returned without consulting the quota.
    /// - A second call for the same key while one is outstanding gets
    ///   [`FetchError::DuplicateRequest`] without side effects.
    /// - Quota denial returns [`FetchError::QuotaExceeded`] without invoking
    ///   `fetch_fn`.
    /// - On success the call is recorded against the quota and the payload is
    ///   cached; on failure nothing is recorded or cached.
    pub async fn fetch<T, E, F, Fut>(
        &self,
        service: ApiService,
        key: &str,
        force_refresh: bool,
        fetch_fn: F,
    ) -> Result<T, FetchError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: std::error::Error + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !force_refresh {
            if let Some(hit) = self.cache.get::<T>(key) {
                return Ok(hit);
            }
        }

        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(key.to_string()) {
                debug!(key, "dropping duplicate in-flight request");
                return Err(FetchError::DuplicateRequest);
            }
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            key,
        };

        if !self.quota.can_call(service) {
            return Err(FetchError::QuotaExceeded {
                service: service.name(),
                retry_after: self.quota.time_until_reset(service),
            });
        }

        let payload = fetch_fn().await.map_err(FetchError::Upstream)?;
        self.quota.record_call(service);
        self.cache.put(key, &payload);
        Ok(payload)
    }
}
