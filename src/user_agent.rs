//! Shared User-Agent string for mining HTTP clients.
//!
//! Single source for the UA format so all mining traffic identifies
//! itself consistently to the archive.

/// Environment variables consulted for the locale tag, in priority order.
const LOCALE_ENV_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// User-Agent for mining requests. Identifies the tool version, platform,
/// locale, and (when configured) the caller's access key.
#[must_use]
pub(crate) fn mine_user_agent(access_key: &str) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    let lang = locale_tag();
    format!("ia-miner/{version} ({os} {arch}; N; {lang}; {access_key})")
}

/// Two-letter language tag from the locale environment, empty when unset.
fn locale_tag() -> String {
    LOCALE_ENV_VARS
        .iter()
        .filter_map(std::env::var_os)
        .find(|value| !value.is_empty())
        .map(|value| {
            value
                .to_string_lossy()
                .chars()
                .take(2)
                .collect::<String>()
                .to_lowercase()
        })
        .unwrap_or_default()
}
