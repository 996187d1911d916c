//! TOML credential config: load, merge, and save.
//!
//! The config lives at `$XDG_CONFIG_HOME/ia-miner.toml` (or
//! `~/.config/ia-miner.toml`), falling back to `~/.ia-miner.toml` when no
//! config directory exists. A missing file yields an empty config, not an
//! error. The file holds credentials, so it is written with owner-only
//! permissions on Unix.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::{AuthConfig, CredentialBundle};

/// Config file name under the config directory.
const CONFIG_FILE_NAME: &str = "ia-miner.toml";

/// Fallback dotfile name in the home directory.
const CONFIG_DOTFILE_NAME: &str = ".ia-miner.toml";

/// Errors reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written.
    #[error("config file {path}: {source}")]
    Io {
        /// The config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// File exists but is not valid TOML.
    #[error("config file {path} is not valid TOML: {source}")]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Persisted credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// S3-style key pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Section>,
    /// Session cookies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<CookieSection>,
}

/// The `[s3]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Section {
    /// Access key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    /// Secret key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// The `[cookies]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieSection {
    /// The `logged-in-user` cookie value.
    #[serde(rename = "logged-in-user", skip_serializing_if = "Option::is_none")]
    pub logged_in_user: Option<String>,
    /// The `logged-in-sig` cookie value.
    #[serde(rename = "logged-in-sig", skip_serializing_if = "Option::is_none")]
    pub logged_in_sig: Option<String>,
}

impl Config {
    /// Folds login-exchange results into the config. Existing non-empty
    /// values are preserved unless `overwrite` is set.
    pub fn merge(&mut self, auth: &AuthConfig, overwrite: bool) {
        let s3 = self.s3.get_or_insert_with(S3Section::default);
        merge_field(&mut s3.access, &auth.access, overwrite);
        merge_field(&mut s3.secret, &auth.secret, overwrite);

        let cookies = self.cookies.get_or_insert_with(CookieSection::default);
        merge_field(&mut cookies.logged_in_user, &auth.logged_in_user, overwrite);
        merge_field(&mut cookies.logged_in_sig, &auth.logged_in_sig, overwrite);
    }

    /// Builds the credential bundle the engine consumes.
    #[must_use]
    pub fn credentials(&self) -> CredentialBundle {
        let mut bundle = CredentialBundle::new();
        if let Some(s3) = &self.s3
            && let (Some(access), Some(secret)) = (&s3.access, &s3.secret)
        {
            bundle = bundle.with_keys(access, secret);
        }
        if let Some(cookies) = &self.cookies {
            if let Some(user) = &cookies.logged_in_user {
                bundle = bundle.with_cookie("logged-in-user", user);
            }
            if let Some(sig) = &cookies.logged_in_sig {
                bundle = bundle.with_cookie("logged-in-sig", sig);
            }
        }
        bundle
    }
}

fn merge_field(existing: &mut Option<String>, incoming: &Option<String>, overwrite: bool) {
    let empty = existing.as_deref().is_none_or(str::is_empty);
    if (overwrite || empty) && incoming.is_some() {
        existing.clone_from(incoming);
    }
}

/// Resolves the config file path. An explicit override wins; otherwise
/// `$XDG_CONFIG_HOME/ia-miner.toml`, then `~/.config/ia-miner.toml` when
/// that directory exists, then `~/.ia-miner.toml`.
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return PathBuf::from(xdg).join(CONFIG_FILE_NAME);
    }
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
    let config_dir = home.join(".config");
    if config_dir.is_dir() {
        config_dir.join(CONFIG_FILE_NAME)
    } else {
        home.join(CONFIG_DOTFILE_NAME)
    }
}

/// Loads the config. A missing file yields an empty config.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file exists but cannot be read or
/// parsed.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using empty config");
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the config with owner-only permissions on Unix, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be written.
pub fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    // Infallible: Config serializes to a plain table.
    let text = toml::to_string_pretty(config).unwrap_or_default();
    fs::write(path, text).map_err(io_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
    }

    debug!(path = %path.display(), "config saved");
    Ok(())
}
