//! The mining engine: bounded work queues drained by fixed worker pools,
//! paced by a global rate gate, with per-request retry.
//!
//! Control flow: the caller supplies identifiers (queued directly as
//! metadata requests) or a search query (planned into one request per
//! result page). Each request flows queue → worker → rate gate → retry
//! executor → result handler. In mine-ids mode a page's handler derives
//! per-identifier metadata requests into a second queue consumed by a
//! second pool running concurrently with the first.
//!
//! Delivery ordering of results is not guaranteed, identifiers are not
//! deduplicated, and a request that exhausts its retries is dropped with a
//! logged diagnostic.

pub mod constants;
mod engine;
mod error;
mod queue;
pub mod rate_limit;
mod request;
mod retry;
mod search;
mod url;
mod worker;

pub use engine::{MineStats, Miner, MinerOptions};
pub use error::MineError;
pub use queue::WorkQueue;
pub use rate_limit::RateGate;
pub use request::{MineRequest, ResponseCallback, ResponseHandler};
pub use search::{SearchInfo, SearchOptions};
pub use url::HostPool;
