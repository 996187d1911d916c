//! The interactive login exchange: trade a username/password for session
//! cookies and S3-style keys.
//!
//! The login endpoint returns 200 whether or not authentication succeeded;
//! success is detected by the presence of a `logged-in-user` cookie in the
//! response. The resulting session cookies then unlock the key endpoint.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::{CookieStore, Jar};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::mine::MineError;

/// Base URL of the account endpoints.
pub const DEFAULT_ACCOUNT_URL: &str = "https://archive.org";

const LOGIN_FAILED: &str =
    "Failed to authenticate. Please check your credentials and try again.";

/// Credentials obtained from a successful login exchange.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// S3-style access key.
    pub access: Option<String>,
    /// S3-style secret key.
    pub secret: Option<String>,
    /// The `logged-in-user` session cookie value.
    pub logged_in_user: Option<String>,
    /// The `logged-in-sig` session cookie value.
    pub logged_in_sig: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    #[serde(default)]
    key: Keys,
}

#[derive(Debug, Deserialize, Default)]
struct Keys {
    s3accesskey: Option<String>,
    s3secretkey: Option<String>,
}

/// Logs in against `account_url` and fetches the account's keys.
///
/// # Errors
///
/// - [`MineError::Auth`] when no `logged-in-user` cookie comes back.
/// - [`MineError::Request`] on transport failures.
#[instrument(skip(username, password))]
pub async fn login(
    account_url: &str,
    username: &str,
    password: &str,
) -> Result<AuthConfig, MineError> {
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .cookie_provider(Arc::clone(&jar))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|source| MineError::Client { source })?;

    let login_url = format!("{}/account/login.php", account_url.trim_end_matches('/'));
    client
        .post(&login_url)
        // Cookies expire very quickly without remember=CHECKED.
        .form(&[
            ("remember", "CHECKED"),
            ("action", "login"),
            ("username", username),
            ("password", password),
        ])
        .header("Cookie", "test-cookie=1")
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| MineError::request(&login_url, e))?;

    let origin = Url::parse(account_url)
        .map_err(|_| MineError::auth(format!("invalid account URL: {account_url}")))?;
    let cookies = session_cookies(&jar, &origin);
    let logged_in_user = cookie_value(&cookies, "logged-in-user");
    // The endpoint returns 200 for failed logins; the cookie is the signal.
    let Some(logged_in_user) = logged_in_user else {
        return Err(MineError::auth(LOGIN_FAILED));
    };
    let logged_in_sig = cookie_value(&cookies, "logged-in-sig");
    debug!("login cookies obtained");

    let keys_url = format!("{}/account/s3.php", account_url.trim_end_matches('/'));
    let keys: KeyResponse = client
        .get(&keys_url)
        .query(&[("output_json", "1")])
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| MineError::request(&keys_url, e))?
        .json()
        .await
        .map_err(|e| MineError::request(&keys_url, e))?;

    Ok(AuthConfig {
        access: keys.key.s3accesskey,
        secret: keys.key.s3secretkey,
        logged_in_user: Some(logged_in_user),
        logged_in_sig,
    })
}

/// Reads the jar's cookies for an origin as `name=value` pairs.
fn session_cookies(jar: &Jar, origin: &Url) -> Vec<(String, String)> {
    let Some(header) = jar.cookies(origin) else {
        return Vec::new();
    };
    let Ok(header) = header.to_str() else {
        return Vec::new();
    };
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn cookie_value(cookies: &[(String, String)], name: &str) -> Option<String> {
    cookies
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
}
