//! The mining engine: an explicit context object owning the HTTP client,
//! the rate gate, and the worker configuration.
//!
//! A [`Miner`] is constructed by the caller with [`Miner::connect`], which
//! validates credentials and probes the service's request rate before any
//! work is accepted. Multiple engines can coexist; there is no global
//! runtime state. Cookie and connection state is owned by the engine and
//! built once at construction — workers only read it.
//!
//! # Example
//!
//! ```no_run
//! use ia_miner::auth::CredentialBundle;
//! use ia_miner::mine::{Miner, MinerOptions, ResponseHandler};
//!
//! # async fn example() -> Result<(), ia_miner::mine::MineError> {
//! let miner = Miner::connect(&CredentialBundle::default(), MinerOptions::default()).await?;
//! let stats = miner
//!     .mine_items(["nasa", "internetarchive"], &[], ResponseHandler::PrintBody)
//!     .await;
//! eprintln!("completed: {}, abandoned: {}", stats.completed(), stats.abandoned());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::Jar;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::auth::{self, CredentialBundle};
use crate::user_agent::mine_user_agent;

use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_MAX_RETRIES, DEFAULT_WORKERS, QUEUE_CAPACITY,
    READ_TIMEOUT_SECS,
};
use super::error::MineError;
use super::queue::WorkQueue;
use super::rate_limit::{RateGate, probe_rate_limit};
use super::request::{MineRequest, ResponseHandler};
use super::search::{
    SearchInfo, SearchOptions, build_search_params, fetch_search_info, page_params,
    rows_from_params, total_pages,
};
use super::url::HostPool;
use super::worker::{self, FanoutTarget, WorkerContext};

/// Configuration for a [`Miner`].
#[derive(Debug, Clone)]
pub struct MinerOptions {
    /// Total worker budget per mining operation. In mine-ids mode the
    /// budget is split evenly between the page pool and the identifier
    /// pool.
    pub workers: usize,
    /// Retry budget per request.
    pub retries: u32,
    /// Use HTTPS. HTTP is the default.
    pub secure: bool,
    /// Hosts to pick from at random per request. Empty means the default
    /// host.
    pub hosts: Vec<String>,
    /// Allow the service to cache fetched metadata. By default every
    /// metadata request carries `dontcache=1`.
    pub cache: bool,
    /// Verbose per-attempt diagnostics.
    pub debug: bool,
    /// Override for the credential-check endpoint.
    pub auth_url: Option<String>,
}

impl Default for MinerOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            retries: DEFAULT_MAX_RETRIES,
            secure: false,
            hosts: Vec::new(),
            cache: false,
            debug: false,
            auth_url: None,
        }
    }
}

/// Counters for one mining operation, tracked atomically across workers.
#[derive(Debug, Default)]
pub struct MineStats {
    completed: AtomicUsize,
    abandoned: AtomicUsize,
    retried: AtomicUsize,
}

impl MineStats {
    /// Creates a stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that reached a successful terminal outcome.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Requests abandoned after exhausting their retry budget.
    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Retry attempts performed across all requests.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Total requests that reached a terminal outcome.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed() + self.abandoned()
    }

    pub(crate) fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }
}

/// The mining engine.
///
/// Owns one connection pool (with the cookie state from the credential
/// bundle) shared read-only by all workers in all pools, and one rate gate
/// enforcing the global dispatch spacing.
#[derive(Debug)]
pub struct Miner {
    client: Client,
    gate: Arc<RateGate>,
    hosts: Arc<HostPool>,
    options: MinerOptions,
}

impl Miner {
    /// Builds an engine: loads cookie state, validates credentials, and
    /// probes the service's request rate.
    ///
    /// The credential gate runs only when the bundle carries an
    /// access/secret pair; anonymous mining skips it. Both the gate and the
    /// rate probe must pass before any work is accepted.
    ///
    /// # Errors
    ///
    /// - [`MineError::InvalidWorkers`] for a zero worker budget.
    /// - [`MineError::Client`] if the HTTP client cannot be built.
    /// - [`MineError::Auth`] if the service rejects the credentials.
    /// - [`MineError::RateProbe`] if the rate-limit resource is unreachable.
    #[instrument(skip(credentials, options), fields(workers = options.workers))]
    pub async fn connect(
        credentials: &CredentialBundle,
        options: MinerOptions,
    ) -> Result<Self, MineError> {
        if options.workers == 0 {
            return Err(MineError::InvalidWorkers {
                value: options.workers,
            });
        }

        let hosts = Arc::new(HostPool::new(options.secure, options.hosts.clone()));
        let client = build_client(credentials, &hosts)?;

        if let (Some(access), Some(secret)) = (credentials.access(), credentials.secret()) {
            let auth_url = options
                .auth_url
                .clone()
                .unwrap_or_else(|| auth::DEFAULT_AUTH_URL.to_string());
            auth::validate(&client, &auth_url, access, secret).await?;
            debug!("credential gate passed");
        }

        let rate = probe_rate_limit(&client, &hosts).await?;
        let gate = Arc::new(RateGate::per_second(rate));

        info!(
            workers = options.workers,
            retries = options.retries,
            rate_per_second = rate,
            "miner connected"
        );

        Ok(Self {
            client,
            gate,
            hosts,
            options,
        })
    }

    /// The global rate gate shared by every worker.
    #[must_use]
    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// The configured options.
    #[must_use]
    pub fn options(&self) -> &MinerOptions {
        &self.options
    }

    /// Mines metadata for a set of identifiers.
    ///
    /// Each identifier becomes one metadata request carrying the caller's
    /// `params` (plus `dontcache=1` unless caching was requested). Returns
    /// once every request has reached a terminal outcome. Completion order
    /// is unordered; a request that exhausts its retries is dropped with a
    /// logged diagnostic.
    pub async fn mine_items<I>(
        &self,
        identifiers: I,
        params: &[(String, String)],
        handler: ResponseHandler,
    ) -> MineStats
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let params = self.metadata_params(params);
        let stats = Arc::new(MineStats::new());
        let queue = Arc::new(WorkQueue::new(QUEUE_CAPACITY));
        let handles = worker::spawn(
            Arc::clone(&queue),
            Arc::new(WorkerContext {
                client: self.client.clone(),
                gate: Arc::clone(&self.gate),
                stats: Arc::clone(&stats),
                fanout: None,
            }),
            self.options.workers,
        );

        for identifier in identifiers {
            let request = MineRequest::get(
                self.hosts.metadata_url(identifier.as_ref()),
                params.clone(),
                self.options.retries,
                self.options.debug,
                handler.clone(),
            );
            queue.push(request).await;
        }

        queue.join().await;
        queue.close();
        join_workers(handles).await;
        unwrap_stats(stats)
    }

    /// Fetches an arbitrary set of URLs through the same queue, pool, and
    /// rate-gate machinery. Caller params are sent as-is (no `dontcache`
    /// default).
    pub async fn mine_urls<I>(
        &self,
        urls: I,
        params: &[(String, String)],
        handler: ResponseHandler,
    ) -> MineStats
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let stats = Arc::new(MineStats::new());
        let queue = Arc::new(WorkQueue::new(QUEUE_CAPACITY));
        let handles = worker::spawn(
            Arc::clone(&queue),
            Arc::new(WorkerContext {
                client: self.client.clone(),
                gate: Arc::clone(&self.gate),
                stats: Arc::clone(&stats),
                fanout: None,
            }),
            self.options.workers,
        );

        for url in urls {
            let request = MineRequest::get(
                url.as_ref(),
                params.to_vec(),
                self.options.retries,
                self.options.debug,
                handler.clone(),
            );
            queue.push(request).await;
        }

        queue.join().await;
        queue.close();
        join_workers(handles).await;
        unwrap_stats(stats)
    }

    /// Mines search results for a query (the whole corpus when `None`).
    ///
    /// Plans one page request per result page. Without mine-ids, `handler`
    /// runs on each page response. With mine-ids, pages fan out into
    /// per-identifier metadata requests consumed by a second pool running
    /// concurrently with the first, and `handler` runs on each metadata
    /// response instead; the worker budget is split evenly between the two
    /// pools, and both drain fully before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`MineError::InvalidRows`] for a zero page size, or
    /// [`MineError::Request`] if the hit-count probe fails.
    pub async fn search(
        &self,
        query: Option<&str>,
        options: &SearchOptions,
        handler: Option<ResponseHandler>,
    ) -> Result<MineStats, MineError> {
        let base = build_search_params(query, options);
        let rows = rows_from_params(&base);
        if rows == 0 {
            return Err(MineError::InvalidRows);
        }

        let info = fetch_search_info(&self.client, &self.hosts.search_url(), &base).await?;
        let pages = total_pages(info.num_found, u64::from(rows))?;
        debug!(num_found = info.num_found, pages, "search planned");

        let stats = Arc::new(MineStats::new());
        if pages == 0 {
            return Ok(unwrap_stats(stats));
        }

        let (page_workers, item_workers) = if options.mine_ids {
            let page_workers = (self.options.workers / 2).max(1);
            let item_workers = (self.options.workers - page_workers).max(1);
            (page_workers, item_workers)
        } else {
            (self.options.workers, 0)
        };

        let handler = handler.unwrap_or(ResponseHandler::PrintBody);
        let mut handles = Vec::new();

        // In mine-ids mode a second queue and pool consume the metadata
        // requests derived from each page.
        let item_queue = if options.mine_ids {
            let item_queue = Arc::new(WorkQueue::new(QUEUE_CAPACITY));
            handles.extend(worker::spawn(
                Arc::clone(&item_queue),
                Arc::new(WorkerContext {
                    client: self.client.clone(),
                    gate: Arc::clone(&self.gate),
                    stats: Arc::clone(&stats),
                    fanout: None,
                }),
                item_workers,
            ));
            Some(item_queue)
        } else {
            None
        };

        let (page_handler, fanout) = if let Some(item_queue) = &item_queue {
            let fanout = FanoutTarget {
                queue: Arc::clone(item_queue),
                hosts: Arc::clone(&self.hosts),
                params: self.metadata_params(&[]),
                retries: self.options.retries,
                debug: self.options.debug,
                handler,
            };
            (ResponseHandler::FanoutIdentifiers, Some(fanout))
        } else {
            (handler, None)
        };

        let page_queue = Arc::new(WorkQueue::new(QUEUE_CAPACITY));
        handles.extend(worker::spawn(
            Arc::clone(&page_queue),
            Arc::new(WorkerContext {
                client: self.client.clone(),
                gate: Arc::clone(&self.gate),
                stats: Arc::clone(&stats),
                fanout,
            }),
            page_workers,
        ));

        for page in 1..=pages {
            let request = MineRequest::get(
                self.hosts.search_url(),
                page_params(&base, page),
                self.options.retries,
                self.options.debug,
                page_handler.clone(),
            );
            page_queue.push(request).await;
        }

        // All pages drain first; every fan-out push lands before its page is
        // marked done, so joining the item queue afterwards is race-free.
        page_queue.join().await;
        page_queue.close();
        if let Some(item_queue) = &item_queue {
            item_queue.join().await;
            item_queue.close();
        }
        join_workers(handles).await;
        Ok(unwrap_stats(stats))
    }

    /// Performs only the `rows=0` probe and returns the search response
    /// header together with the hit count. No page fetches are scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`MineError::Request`] if the probe fails.
    pub async fn search_info(
        &self,
        query: Option<&str>,
        options: &SearchOptions,
    ) -> Result<SearchInfo, MineError> {
        let base = build_search_params(query, options);
        fetch_search_info(&self.client, &self.hosts.search_url(), &base).await
    }

    /// Metadata request parameters: the caller's, plus `dontcache=1` unless
    /// caching was requested or the caller already set it.
    fn metadata_params(&self, params: &[(String, String)]) -> Vec<(String, String)> {
        let mut params = params.to_vec();
        if !self.options.cache && !params.iter().any(|(k, _)| k == "dontcache") {
            params.push(("dontcache".to_string(), "1".to_string()));
        }
        params
    }
}

/// Builds the engine's shared HTTP client with the cookie state from the
/// credential bundle loaded for every configured host.
fn build_client(credentials: &CredentialBundle, hosts: &HostPool) -> Result<Client, MineError> {
    let jar = Arc::new(Jar::default());
    let cookie_hosts: Vec<&str> = if hosts.hosts().is_empty() {
        vec![DEFAULT_HOST]
    } else {
        hosts.hosts().iter().map(String::as_str).collect()
    };
    for (name, value) in credentials.cookies() {
        for host in &cookie_hosts {
            if let Ok(origin) = url::Url::parse(&format!("{}{}/", hosts.protocol(), host)) {
                jar.add_cookie_str(&format!("{name}={value}"), &origin);
            }
        }
    }

    let access_key = credentials.access().unwrap_or("");
    Client::builder()
        .user_agent(mine_user_agent(access_key))
        .cookie_provider(jar)
        .gzip(true)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .build()
        .map_err(|source| MineError::Client { source })
}

async fn join_workers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "worker task panicked");
        }
    }
}

/// Recovers owned stats from the shared counter. All workers have exited,
/// so sole ownership is expected; fall back to a copy if not.
fn unwrap_stats(stats: Arc<MineStats>) -> MineStats {
    match Arc::try_unwrap(stats) {
        Ok(stats) => stats,
        Err(shared) => {
            let stats = MineStats::new();
            stats
                .completed
                .store(shared.completed(), Ordering::SeqCst);
            stats
                .abandoned
                .store(shared.abandoned(), Ordering::SeqCst);
            stats.retried.store(shared.retried(), Ordering::SeqCst);
            stats
        }
    }
}
