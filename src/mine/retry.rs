//! Per-request execution with fixed-backoff retry.
//!
//! A short fixed-delay retry with a bounded attempt count gives resilience
//! against transient failures without unbounded queuing. A request whose
//! budget is exhausted is abandoned with a diagnostic; the operation
//! continues.

use reqwest::{Client, Response};
use tracing::{debug, warn};

use super::constants::RETRY_BACKOFF;
use super::engine::MineStats;
use super::rate_limit::RateGate;
use super::request::MineRequest;

/// Executes one request, retrying in place on any transport-level or
/// non-2xx failure until the budget is exhausted.
///
/// Each attempt is a dispatch and re-acquires the rate gate. Returns the
/// successful response, or `None` once the request has been abandoned.
/// The caller dispatches the result handler; handler failures are not
/// retried here.
pub(crate) async fn execute(
    client: &Client,
    gate: &RateGate,
    request: &MineRequest,
    stats: &MineStats,
) -> Option<Response> {
    let mut retries_left = request.max_retries();

    loop {
        gate.acquire().await;

        match send(client, request).await {
            Ok(response) => return Some(response),
            Err(error) => {
                if retries_left == 0 {
                    // Terminal outcome: report and move on, never raise.
                    if request.debug() {
                        warn!(
                            url = request.url(),
                            params = ?request.params(),
                            retries = request.max_retries(),
                            error = %error,
                            handler = request.handler().kind(),
                            "maximum retries exceeded, giving up"
                        );
                    } else {
                        warn!(
                            url = request.url(),
                            params = ?request.params(),
                            retries = request.max_retries(),
                            "maximum retries exceeded, giving up"
                        );
                    }
                    return None;
                }

                retries_left -= 1;
                stats.increment_retried();
                if request.debug() {
                    debug!(
                        url = request.url(),
                        params = ?request.params(),
                        retries_left,
                        error = %error,
                        "request failed, retrying"
                    );
                }
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }
    }
}

/// Performs one HTTP attempt. Non-2xx statuses count as failures.
async fn send(client: &Client, request: &MineRequest) -> Result<Response, reqwest::Error> {
    client
        .request(request.method().clone(), request.url())
        .query(request.params())
        .send()
        .await?
        .error_for_status()
}
