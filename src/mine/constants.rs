//! Constants for the mining engine (defaults, endpoints, timeouts).

use std::time::Duration;

/// Default number of workers per mining operation.
pub const DEFAULT_WORKERS: usize = 100;

/// Default retry budget per request.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default page size for search requests.
pub const DEFAULT_ROWS: u32 = 50;

/// Fixed backoff between retry attempts (1 second).
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Rate assumed when the rate-limit resource is reachable but carries no
/// `rate_per_second` field.
pub const DEFAULT_RATE_PER_SECOND: u32 = 300;

/// Identifier of the metadata resource that advertises the request rate.
pub const RATE_LIMITER_ITEM: &str = "iamine-rate-limiter";

/// Host used when no host list is configured.
pub const DEFAULT_HOST: &str = "archive.org";

/// Pending-request capacity of one work queue. A full queue exerts
/// backpressure on the producer.
pub const QUEUE_CAPACITY: usize = 1000;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large metadata bodies).
pub const READ_TIMEOUT_SECS: u64 = 300;
