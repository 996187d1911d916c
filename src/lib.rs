//! Concurrent bulk-mining client for the Internet Archive APIs.
//!
//! This library fetches item metadata, arbitrary archive URLs, and search
//! results concurrently under a server-advertised rate limit.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`mine`] - Concurrent mining engine: work queue, rate gate, retries,
//!   search planning, and response handling
//! - [`auth`] - Credential gate and the username/password login exchange
//! - [`config`] - Persisted credential config (TOML)

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod mine;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use auth::{AuthConfig, CredentialBundle, login};
pub use config::{Config, ConfigError};
pub use mine::{
    MineError, MineRequest, MineStats, Miner, MinerOptions, RateGate, ResponseHandler, SearchInfo,
    SearchOptions, WorkQueue,
};
