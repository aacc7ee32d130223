//! Candidate-endpoint resolution.
//!
//! The backend may be reachable through several base URLs (production host,
//! emulator loopback, LAN address). The resolver probes them in priority
//! order with a bounded deadline, caches the first reachable one for the
//! process lifetime, and falls back to the last candidate in degraded mode
//! when nothing answers so callers can proceed optimistically.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Per-candidate reachability probe deadline.
/// 5s tolerates a cold backend without hanging app startup indefinitely.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Retry schedule for the single-candidate case, where there is no lower
/// priority endpoint to fall through to. Injectable so tests run without
/// real delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(2),
        }
    }
}

/// The outcome of a resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub base_url: String,
    /// When the probe confirmed reachability; `None` in degraded mode.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// 1-based probe attempt (candidate index, or retry count when there is
    /// only one candidate).
    pub attempt: u32,
    pub degraded: bool,
}

/// Probes candidates sequentially and caches the winner.
///
/// Probing is sequential on purpose: the candidate list is a priority order,
/// and a lower-priority endpoint must not win just because it answered first.
pub struct EndpointResolver {
    client: Client,
    candidates: Vec<String>,
    probe_timeout: Duration,
    backoff: BackoffPolicy,
    resolved: Mutex<Option<ResolvedEndpoint>>,
}

impl EndpointResolver {
    pub fn new(client: Client, candidates: Vec<String>) -> Self {
        debug_assert!(!candidates.is_empty(), "at least one candidate required");
        Self {
            client,
            candidates,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            backoff: BackoffPolicy::default(),
            resolved: Mutex::new(None),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// The base URL to use for the next request; probes on first use, then
    /// serves the cached endpoint. Holding the lock across the probe pass
    /// keeps concurrent first calls from racing duplicate probes.
    pub async fn resolve(&self) -> ResolvedEndpoint {
        let mut cached = self.resolved.lock().await;
        if let Some(ref endpoint) = *cached {
            return endpoint.clone();
        }
        let endpoint = self.probe_candidates().await;
        *cached = Some(endpoint.clone());
        endpoint
    }

    /// Drop the cached endpoint and probe again. For connectivity-changed
    /// events and test harnesses; ordinary requests never trigger this.
    pub async fn reresolve(&self) -> ResolvedEndpoint {
        let mut cached = self.resolved.lock().await;
        let endpoint = self.probe_candidates().await;
        *cached = Some(endpoint.clone());
        endpoint
    }

    async fn probe_candidates(&self) -> ResolvedEndpoint {
        if self.candidates.len() == 1 {
            return self.probe_with_retries(&self.candidates[0]).await;
        }

        for (index, candidate) in self.candidates.iter().enumerate() {
            if self.probe(candidate).await {
                debug!(url = %candidate, "endpoint reachable");
                return ResolvedEndpoint {
                    base_url: candidate.clone(),
                    confirmed_at: Some(Utc::now()),
                    attempt: index as u32 + 1,
                    degraded: false,
                };
            }
        }

        let last = self.candidates.last().cloned().unwrap_or_default();
        warn!(url = %last, "no candidate endpoint reachable, proceeding degraded");
        ResolvedEndpoint {
            base_url: last,
            confirmed_at: None,
            attempt: self.candidates.len() as u32,
            degraded: true,
        }
    }

    /// Single required endpoint: retry on a fixed interval before giving up
    /// and returning it degraded anyway.
    async fn probe_with_retries(&self, url: &str) -> ResolvedEndpoint {
        let attempts = self.backoff.attempts.max(1);
        for attempt in 1..=attempts {
            if self.probe(url).await {
                debug!(url = %url, attempt, "endpoint reachable");
                return ResolvedEndpoint {
                    base_url: url.to_string(),
                    confirmed_at: Some(Utc::now()),
                    attempt,
                    degraded: false,
                };
            }
            if attempt < attempts {
                tokio::time::sleep(self.backoff.interval).await;
            }
        }
        warn!(url = %url, attempts, "endpoint not reachable after retries, proceeding degraded");
        ResolvedEndpoint {
            base_url: url.to_string(),
            confirmed_at: None,
            attempt: attempts,
            degraded: true,
        }
    }

    /// One bounded reachability check: GET on the candidate root, any 2xx
    /// counts. A probe past its deadline is dropped, not awaited.
    async fn probe(&self, base_url: &str) -> bool {
        let url = format!("{}/", base_url.trim_end_matches('/'));
        match tokio::time::timeout(self.probe_timeout, self.client.get(&url).send()).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(e)) => {
                debug!(url = %url, error = %e, "probe failed");
                false
            }
            Err(_) => {
                debug!(url = %url, timeout_ms = self.probe_timeout.as_millis() as u64, "probe timed out");
                false
            }
        }
    }
}
