//! Long-lived workers draining one work queue.
//!
//! Each worker loops: dequeue, pace through the shared rate gate, execute
//! with retry, dispatch the result handler, mark the item done. A pool of W
//! workers therefore never has more than W requests in flight. Workers shut
//! down by observing queue closure at the dequeue suspension point, never
//! mid-request.

use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::engine::MineStats;
use super::queue::WorkQueue;
use super::rate_limit::RateGate;
use super::request::{MineRequest, ResponseHandler};
use super::url::HostPool;
use super::{retry, search};

/// Where fan-out handlers inject derived metadata requests.
pub(crate) struct FanoutTarget {
    /// The secondary queue consumed by the identifier pool.
    pub(crate) queue: Arc<WorkQueue>,
    pub(crate) hosts: Arc<HostPool>,
    /// Query parameters for each derived metadata request.
    pub(crate) params: Vec<(String, String)>,
    pub(crate) retries: u32,
    pub(crate) debug: bool,
    /// Handler attached to each derived request.
    pub(crate) handler: ResponseHandler,
}

/// Shared state handed to every worker of one pool.
pub(crate) struct WorkerContext {
    pub(crate) client: Client,
    pub(crate) gate: Arc<RateGate>,
    pub(crate) stats: Arc<MineStats>,
    pub(crate) fanout: Option<FanoutTarget>,
}

/// Spawns exactly `count` workers draining `queue`.
pub(crate) fn spawn(
    queue: Arc<WorkQueue>,
    context: Arc<WorkerContext>,
    count: usize,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let queue = Arc::clone(&queue);
            let context = Arc::clone(&context);
            tokio::spawn(run(worker_id, queue, context))
        })
        .collect()
}

async fn run(worker_id: usize, queue: Arc<WorkQueue>, context: Arc<WorkerContext>) {
    while let Some(request) = queue.pop().await {
        match retry::execute(&context.client, &context.gate, &request, &context.stats).await {
            Some(response) => {
                context.stats.increment_completed();
                dispatch(&context, request.into_handler(), response).await;
            }
            None => context.stats.increment_abandoned(),
        }
        queue.task_done();
    }
    debug!(worker_id, "worker shut down");
}

/// Runs the result handler for one successful response. Handler failures
/// are logged, never retried.
async fn dispatch(context: &WorkerContext, handler: ResponseHandler, response: reqwest::Response) {
    let url = response.url().to_string();
    match handler {
        ResponseHandler::PrintBody => match response.text().await {
            Ok(body) => println!("{body}"),
            Err(e) => warn!(url = %url, error = %e, "failed to read response body"),
        },
        ResponseHandler::PrintIdentifiers => match response.json::<Value>().await {
            Ok(page) => {
                for identifier in search::extract_identifiers(&page) {
                    println!("{identifier}");
                }
            }
            Err(e) => warn!(url = %url, error = %e, "failed to parse search page"),
        },
        ResponseHandler::FanoutIdentifiers => fanout(context, &url, response).await,
        ResponseHandler::Callback(callback) => callback(response).await,
    }
}

/// Parses a search page and enqueues one metadata request per document
/// identifier into the secondary queue.
async fn fanout(context: &WorkerContext, url: &str, response: reqwest::Response) {
    let Some(target) = &context.fanout else {
        warn!(url = %url, "fan-out handler invoked with no fan-out target");
        return;
    };

    let page = match response.json::<Value>().await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %url, error = %e, "failed to parse search page for fan-out");
            return;
        }
    };

    let identifiers = search::extract_identifiers(&page);
    debug!(url = %url, count = identifiers.len(), "fanning out identifiers");
    for identifier in identifiers {
        let request = MineRequest::get(
            target.hosts.metadata_url(&identifier),
            target.params.clone(),
            target.retries,
            target.debug,
            target.handler.clone(),
        );
        target.queue.push(request).await;
    }
}
