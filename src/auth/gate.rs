//! Pre-flight credential validation against the storage-authorization
//! endpoint.
//!
//! Runs once, before the engine accepts any work. Its failure is fatal to
//! the whole mining operation — no request is scheduled until it passes.

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::mine::MineError;

/// The storage-authorization endpoint used to check credentials.
pub const DEFAULT_AUTH_URL: &str = "https://s3.us.archive.org";

/// Credential-check response. Anything short of an explicit
/// `"authorized": true` is treated as failure.
#[derive(Debug, Deserialize)]
struct AuthCheck {
    authorized: Option<bool>,
    error: Option<String>,
}

/// Validates an access/secret pair against the credential-check endpoint.
///
/// The pair is sent in the service's custom `LOW` Authorization scheme.
///
/// # Errors
///
/// - [`MineError::Auth`] carrying the service's error message when the
///   response lacks an explicit authorized flag.
/// - [`MineError::Request`] when the endpoint is unreachable or returns a
///   non-JSON body.
#[instrument(skip(client, access, secret))]
pub async fn validate(
    client: &Client,
    auth_url: &str,
    access: &str,
    secret: &str,
) -> Result<(), MineError> {
    let check: AuthCheck = client
        .get(auth_url)
        .query(&[("check_auth", "1")])
        .header(AUTHORIZATION, format!("LOW {access}:{secret}"))
        .send()
        .await
        .map_err(|e| MineError::request(auth_url, e))?
        .json()
        .await
        .map_err(|e| MineError::request(auth_url, e))?;

    if check.authorized == Some(true) {
        debug!("credentials authorized");
        Ok(())
    } else {
        Err(MineError::auth(check.error.unwrap_or_else(|| {
            "credentials were not authorized".to_string()
        })))
    }
}
