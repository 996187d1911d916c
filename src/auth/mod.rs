//! Credentials: the bundle supplied to the engine, the pre-flight
//! credential gate, and the interactive login exchange.

mod gate;
mod login;

use std::fmt;

pub use gate::{DEFAULT_AUTH_URL, validate};
pub use login::{AuthConfig, DEFAULT_ACCOUNT_URL, login};

/// Access credentials supplied to the engine: an optional S3-style key
/// pair and the session cookies attached to every request.
///
/// Read-only to the engine. Secrets and cookie values are redacted in
/// Debug output to prevent accidental logging.
#[derive(Clone, Default)]
pub struct CredentialBundle {
    access: Option<String>,
    secret: Option<String>,
    cookies: Vec<(String, String)>,
}

impl CredentialBundle {
    /// Creates an empty (anonymous) bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the access/secret key pair.
    #[must_use]
    pub fn with_keys(mut self, access: impl Into<String>, secret: impl Into<String>) -> Self {
        self.access = Some(access.into());
        self.secret = Some(secret.into());
        self
    }

    /// Adds one session cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// The access key, when configured.
    #[must_use]
    pub fn access(&self) -> Option<&str> {
        self.access.as_deref()
    }

    /// The secret key, when configured. Sensitive — never log.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// The session cookies. Values are sensitive — never log.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Whether a full key pair is configured (the credential gate runs
    /// only when it is).
    #[must_use]
    pub fn has_keys(&self) -> bool {
        self.access.is_some() && self.secret.is_some()
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("access", &self.access)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field(
                "cookies",
                &self
                    .cookies
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bundle_is_anonymous() {
        let bundle = CredentialBundle::new();
        assert!(!bundle.has_keys());
        assert!(bundle.access().is_none());
        assert!(bundle.cookies().is_empty());
    }

    #[test]
    fn test_with_keys_and_cookies() {
        let bundle = CredentialBundle::new()
            .with_keys("AKEY", "SKEY")
            .with_cookie("logged-in-user", "user%40example.org")
            .with_cookie("logged-in-sig", "sig-value");
        assert!(bundle.has_keys());
        assert_eq!(bundle.access(), Some("AKEY"));
        assert_eq!(bundle.secret(), Some("SKEY"));
        assert_eq!(bundle.cookies().len(), 2);
    }

    #[test]
    fn test_debug_redacts_secret_and_cookie_values() {
        let bundle = CredentialBundle::new()
            .with_keys("AKEY", "super-secret")
            .with_cookie("logged-in-sig", "sensitive-sig");
        let debug = format!("{bundle:?}");
        assert!(!debug.contains("super-secret"), "secret leaked: {debug}");
        assert!(!debug.contains("sensitive-sig"), "cookie leaked: {debug}");
        assert!(debug.contains("logged-in-sig"), "cookie name kept: {debug}");
    }
}
