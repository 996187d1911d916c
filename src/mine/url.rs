//! URL construction with random host selection.
//!
//! Every request picks a host uniformly at random from the configured host
//! list, spreading bulk load across the service's nodes. With no host list,
//! the default host is used.

use rand::seq::SliceRandom;

use super::constants::DEFAULT_HOST;

/// Builds absolute URLs against a protocol and a set of candidate hosts.
#[derive(Debug, Clone)]
pub struct HostPool {
    protocol: &'static str,
    hosts: Vec<String>,
}

impl HostPool {
    /// Creates a host pool. HTTP is used unless `secure` is set.
    /// Blank host entries are dropped.
    #[must_use]
    pub fn new(secure: bool, hosts: Vec<String>) -> Self {
        let protocol = if secure { "https://" } else { "http://" };
        let hosts = hosts
            .into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        Self { protocol, hosts }
    }

    /// Returns the configured protocol prefix (`http://` or `https://`).
    #[must_use]
    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    /// Returns the candidate hosts. Empty means the default host is used.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Makes an absolute URL for `path`, choosing a host at random.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        let host = self
            .hosts
            .choose(&mut rand::thread_rng())
            .map_or(DEFAULT_HOST, String::as_str);
        format!("{}{}{}", self.protocol, host, path.trim())
    }

    /// Makes a metadata URL for one identifier.
    #[must_use]
    pub fn metadata_url(&self, identifier: &str) -> String {
        self.url(&format!("/metadata/{}", identifier.trim()))
    }

    /// Makes the advanced-search URL.
    #[must_use]
    pub fn search_url(&self) -> String {
        self.url("/advancedsearch.php")
    }
}
