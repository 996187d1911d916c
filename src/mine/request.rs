//! The retryable unit of fetch work and its result-handler variants.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::Method;

/// A caller-supplied response callback, invoked once per successful fetch.
pub type ResponseCallback =
    Arc<dyn Fn(reqwest::Response) -> BoxFuture<'static, ()> + Send + Sync>;

/// What to do with a successful response.
///
/// A closed set of variants dispatched by a single match in the worker,
/// rather than dynamically composed handler chains. The handler runs once;
/// its own failure is logged, never retried.
#[derive(Clone)]
pub enum ResponseHandler {
    /// Drain the body and print it to stdout.
    PrintBody,
    /// Parse a search page and print each document's identifier,
    /// skipping documents without one.
    PrintIdentifiers,
    /// Parse a search page and enqueue one metadata request per document
    /// identifier into the secondary queue (mine-ids mode).
    FanoutIdentifiers,
    /// Hand the raw response to a caller-supplied callback.
    Callback(ResponseCallback),
}

impl ResponseHandler {
    /// Short name used in debug diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PrintBody => "print-body",
            Self::PrintIdentifiers => "print-identifiers",
            Self::FanoutIdentifiers => "fanout-identifiers",
            Self::Callback(_) => "callback",
        }
    }
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// An immutable description of one HTTP GET to perform: target URL, query
/// parameters, retry budget, and the handler for its response.
///
/// Consumed exactly once by a worker pool and discarded after its terminal
/// outcome.
#[derive(Debug, Clone)]
pub struct MineRequest {
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    max_retries: u32,
    debug: bool,
    handler: ResponseHandler,
}

impl MineRequest {
    /// Creates a GET request descriptor.
    #[must_use]
    pub fn get(
        url: impl Into<String>,
        params: Vec<(String, String)>,
        max_retries: u32,
        debug: bool,
        handler: ResponseHandler,
    ) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            params,
            max_retries,
            debug,
            handler,
        }
    }

    /// The HTTP method (always GET for mining requests).
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The query parameters, in insertion order. Repeated keys are allowed
    /// (indexed field lists use distinct keys like `fl[0]`, `fl[1]`).
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// The retry budget. A request that always fails is attempted
    /// `max_retries + 1` times in total.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether verbose per-attempt diagnostics are enabled.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The result handler for a successful response.
    #[must_use]
    pub fn handler(&self) -> &ResponseHandler {
        &self.handler
    }

    /// Consumes the descriptor, yielding its handler.
    #[must_use]
    pub fn into_handler(self) -> ResponseHandler {
        self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request_fields() {
        let req = MineRequest::get(
            "http://archive.org/metadata/nasa",
            vec![("dontcache".to_string(), "1".to_string())],
            3,
            true,
            ResponseHandler::PrintBody,
        );
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.url(), "http://archive.org/metadata/nasa");
        assert_eq!(req.params().len(), 1);
        assert_eq!(req.max_retries(), 3);
        assert!(req.debug());
    }

    #[test]
    fn test_handler_kind_names() {
        assert_eq!(ResponseHandler::PrintBody.kind(), "print-body");
        assert_eq!(
            ResponseHandler::PrintIdentifiers.kind(),
            "print-identifiers"
        );
        assert_eq!(
            ResponseHandler::FanoutIdentifiers.kind(),
            "fanout-identifiers"
        );
        let cb: ResponseCallback = Arc::new(|_resp| Box::pin(async {}));
        assert_eq!(ResponseHandler::Callback(cb).kind(), "callback");
    }

    #[test]
    fn test_handler_debug_matches_kind() {
        assert_eq!(format!("{:?}", ResponseHandler::PrintBody), "print-body");
    }
}
