//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const SESSION_DIR_NAME: &str = ".libdesk";
pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API URL '{0}': expected an http:// or https:// URL")]
    InvalidApiUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub api_url: String,
    /// File holding the saved session.
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `LIBDESK_API_URL`: default `http://localhost:8080/api`
    /// - `LIBDESK_SESSION_FILE`: default `$HOME/.libdesk/session.json`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] for a non-HTTP base URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] for a non-HTTP base URL.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = match non_empty(lookup("LIBDESK_API_URL")) {
            Some(raw) => normalize_api_url(&raw)?,
            None => DEFAULT_API_URL.to_owned(),
        };
        let session_file = non_empty(lookup("LIBDESK_SESSION_FILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| default_session_file(non_empty(lookup("HOME"))));
        Ok(Self { api_url, session_file })
    }
}

/// Validate a base URL and strip trailing slashes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidApiUrl`] unless `raw` starts with
/// `http://` or `https://` and names a host.
pub fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let rest = trimmed.strip_prefix("http://").or_else(|| trimmed.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(trimmed.to_owned()),
        _ => Err(ConfigError::InvalidApiUrl(raw.to_owned())),
    }
}

fn default_session_file(home: Option<String>) -> PathBuf {
    let base = home.map_or_else(PathBuf::new, PathBuf::from);
    base.join(SESSION_DIR_NAME).join(SESSION_FILE_NAME)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
