//! Global request pacing and the startup rate-limit probe.
//!
//! The service advertises an allowed request rate through the metadata
//! record of a well-known resource. The engine fetches it once at
//! construction and derives a minimum interval between dispatches; the
//! resulting [`RateGate`] is shared by every worker in every pool, so the
//! spacing is global, not per worker.
//!
//! The wait inside [`RateGate::acquire`] is a true suspension on the
//! monotonic clock: only the calling task sleeps, never the whole runtime.
//! Callers queue on the gate's internal mutex, so concurrent acquirers are
//! paced one after another.
//!
//! # Example
//!
//! ```
//! use ia_miner::mine::RateGate;
//!
//! # async fn example() {
//! // 10 requests per second: at least 100ms between dispatches.
//! let gate = RateGate::per_second(10);
//! gate.acquire().await; // first dispatch is immediate
//! gate.acquire().await; // suspends ~100ms
//! # }
//! ```

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::constants::{DEFAULT_RATE_PER_SECOND, RATE_LIMITER_ITEM};
use super::error::MineError;
use super::url::HostPool;

/// Process-wide pacing gate enforcing a minimum interval between dispatches.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    /// Timestamp of the last dispatch. The mutex is held across the pacing
    /// sleep so that a second acquirer waits its own turn behind the first.
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateGate {
    /// Creates a gate allowing `rate` dispatches per second.
    /// A rate of 0 disables pacing.
    #[must_use]
    pub fn per_second(rate: u32) -> Self {
        let min_interval = if rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / f64::from(rate))
        };
        debug!(rate, min_interval_ms = min_interval.as_millis(), "creating rate gate");
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Creates a gate that applies no pacing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::per_second(0)
    }

    /// Returns the enforced minimum interval between dispatches.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until at least the minimum interval has elapsed since the last
    /// dispatch, then records the current time as the new last dispatch.
    ///
    /// The first acquisition proceeds immediately.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Fetches the allowed request rate from the service's well-known
/// rate-limiter resource.
///
/// Returns [`DEFAULT_RATE_PER_SECOND`] when the resource is reachable but
/// carries no rate field. The value may arrive as a JSON number or a
/// numeric string.
///
/// # Errors
///
/// Returns [`MineError::RateProbe`] when the resource is unreachable or
/// returns a non-JSON body — the engine cannot start without it.
#[instrument(skip(client, hosts))]
pub async fn probe_rate_limit(client: &Client, hosts: &HostPool) -> Result<u32, MineError> {
    let url = hosts.metadata_url(RATE_LIMITER_ITEM);
    let body: Value = client
        .get(&url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| MineError::rate_probe(&url, e))?
        .json()
        .await
        .map_err(|e| MineError::rate_probe(&url, e))?;

    let rate = parse_rate_per_second(&body).unwrap_or(DEFAULT_RATE_PER_SECOND);
    debug!(rate, url = %url, "rate-limit probe complete");
    Ok(rate)
}

/// Extracts `metadata.rate_per_second` from a metadata record, accepting
/// both number and numeric-string encodings.
fn parse_rate_per_second(body: &Value) -> Option<u32> {
    let field = body.get("metadata")?.get("rate_per_second")?;
    match field {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
