//! Persisted credentials (spec §6 "Environment").
//!
//! OAuth2 authorization-code exchange and refresh are explicitly out of scope
//! (spec §1); this module only reads/writes the JSON blob a login flow
//! upstream of this crate is expected to produce, and adapts it into a
//! [`galaxy_http::CredentialProvider`] for [`galaxy_client::ContentSystemClient`].
//! Config-dir resolution is grounded on `ngdp-client::config_manager::ConfigManager::get_config_path`,
//! swapped from `dirs`+TOML to the workspace's `directories` crate and JSON,
//! matching the spec's `{access_token, refresh_token, expires_in, login_time}` shape.

use async_trait::async_trait;
use galaxy_http::{BearerToken, CredentialProvider};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// The on-disk credential shape named in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    /// Unix timestamp (seconds) the token was issued at.
    pub login_time: u64,
}

/// Resolves the platform-conventional config directory for this CLI.
fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "galaxy-dl")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Path to the persisted credentials file.
pub fn credentials_path() -> PathBuf {
    config_dir().join("credentials.json")
}

/// Loads credentials from the platform config path, if present.
pub fn load_credentials() -> std::io::Result<Option<StoredCredentials>> {
    let path = credentials_path();
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = std::fs::read(&path)?;
    let credentials = serde_json::from_slice(&bytes).map_err(std::io::Error::other)?;
    Ok(Some(credentials))
}

/// Persists credentials to the platform config path, creating the directory
/// if needed.
pub fn save_credentials(credentials: &StoredCredentials) -> std::io::Result<()> {
    let path = credentials_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(credentials).map_err(std::io::Error::other)?;
    std::fs::write(path, bytes)
}

/// A [`CredentialProvider`] backed by [`StoredCredentials`] read once at
/// startup. This crate never refreshes an expired token itself — that is the
/// upstream login flow's job (spec §1) — so a token past its safety margin
/// surfaces as [`galaxy_http::Error::Unauthorized`] rather than being silently
/// renewed.
pub struct FileCredentialProvider {
    token: BearerToken,
}

impl FileCredentialProvider {
    pub fn from_stored(stored: &StoredCredentials) -> Self {
        let now_unix = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let elapsed = now_unix.saturating_sub(stored.login_time);
        let issued_at = Instant::now()
            .checked_sub(Duration::from_secs(elapsed))
            .unwrap_or_else(Instant::now);
        Self {
            token: BearerToken {
                value: stored.access_token.clone(),
                issued_at,
                lifetime: Duration::from_secs(stored.expires_in),
            },
        }
    }

    /// Loads from the platform config path (spec §6).
    pub fn load() -> galaxy_http::Result<Self> {
        let stored = load_credentials()
            .map_err(|e| galaxy_http::Error::Unauthorized(format!("failed to read credentials file: {e}")))?
            .ok_or_else(|| galaxy_http::Error::Unauthorized("no credentials file found; log in first".to_string()))?;
        Ok(Self::from_stored(&stored))
    }
}

#[async_trait]
impl CredentialProvider for FileCredentialProvider {
    async fn token(&self) -> galaxy_http::Result<BearerToken> {
        if self.token.needs_refresh() {
            debug!("stored credentials are expired or near expiry and this crate does not refresh them");
            return Err(galaxy_http::Error::Unauthorized(
                "stored access token is expired; re-authenticate upstream".to_string(),
            ));
        }
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stored_credentials_do_not_need_refresh() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let stored = StoredCredentials {
            access_token: "abc".into(),
            refresh_token: "def".into(),
            expires_in: 3600,
            login_time: now,
        };
        let provider = FileCredentialProvider::from_stored(&stored);
        assert!(!provider.token.needs_refresh());
    }

    #[test]
    fn expired_stored_credentials_need_refresh() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let stored = StoredCredentials {
            access_token: "abc".into(),
            refresh_token: "def".into(),
            expires_in: 60,
            login_time: now.saturating_sub(3600),
        };
        let provider = FileCredentialProvider::from_stored(&stored);
        assert!(provider.token.needs_refresh());
    }
}
