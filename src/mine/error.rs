//! Error types for the mining engine.
//!
//! Only two classes of failure abort a run: authentication failures and
//! unrecoverable startup conditions (the rate-limit probe being unreachable).
//! Per-request failures are contained by the retry executor and reported
//! through the diagnostic stream, never through these types.

use thiserror::Error;

/// Errors that can abort a mining operation.
#[derive(Debug, Error)]
pub enum MineError {
    /// The service rejected the supplied credentials.
    #[error("authentication failed: {message}")]
    Auth {
        /// The error message reported by the service.
        message: String,
    },

    /// The startup rate-limit probe was unreachable. The engine cannot
    /// start without knowing the allowed request rate.
    #[error("rate-limit probe failed for {url}: {source}")]
    RateProbe {
        /// The probe URL that failed.
        url: String,
        /// The underlying transport or decode error.
        #[source]
        source: reqwest::Error,
    },

    /// A non-retried request (search probe, login exchange) failed.
    #[error("request to {url} failed: {source}")]
    Request {
        /// The URL that failed.
        url: String,
        /// The underlying transport or decode error.
        #[source]
        source: reqwest::Error,
    },

    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// A caller-supplied page size of zero. Page math divides by `rows`,
    /// so this must fail fast instead of looping.
    #[error("rows must be greater than zero")]
    InvalidRows,

    /// An invalid worker count was configured.
    #[error("invalid worker count {value}: must be at least 1")]
    InvalidWorkers {
        /// The invalid value that was provided.
        value: usize,
    },
}

impl MineError {
    /// Creates an authentication error from a service message.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Creates a rate-limit probe error.
    pub fn rate_probe(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::RateProbe {
            url: url.into(),
            source,
        }
    }

    /// Creates a request error with the URL that failed.
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }
}
