//! Bearer token acquisition and refresh.
//!
//! This crate never performs the OAuth2 authorization-code exchange itself — that
//! is explicitly out of scope (spec.md §1). It only consumes whatever token a
//! [`CredentialProvider`] hands back.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Safety margin subtracted from a token's lifetime before it is considered
/// expired, so a refresh always completes before the platform actually rejects it.
pub const REFRESH_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// A bearer token plus enough information to know when it needs refreshing.
#[derive(Debug, Clone)]
pub struct BearerToken {
    /// The token value, sent as `Authorization: Bearer {value}`.
    pub value: String,
    /// When this token was issued.
    pub issued_at: Instant,
    /// How long the token is valid for after issuance.
    pub lifetime: Duration,
}

impl BearerToken {
    /// Creates a token issued right now.
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            value: value.into(),
            issued_at: Instant::now(),
            lifetime,
        }
    }

    /// True once `issued_at + lifetime - REFRESH_SAFETY_MARGIN` is in the past.
    pub fn needs_refresh(&self) -> bool {
        let expires_at = self.issued_at + self.lifetime;
        let refresh_at = expires_at
            .checked_sub(REFRESH_SAFETY_MARGIN)
            .unwrap_or(self.issued_at);
        Instant::now() >= refresh_at
    }
}

/// Capability for obtaining (and refreshing) bearer tokens.
///
/// OAuth2 authorization-code exchange and refresh-token handling live entirely
/// behind implementations of this trait, outside this workspace.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a token, refreshing it first if it is expired or close to expiry.
    async fn token(&self) -> crate::Result<BearerToken>;
}

/// A provider that always returns the same token, useful for tests and for CLI
/// flows that read a pre-obtained access token from the credentials file rather
/// than performing a login.
pub struct StaticTokenProvider {
    token: BearerToken,
}

impl StaticTokenProvider {
    /// Wraps a token that never needs refreshing (lifetime effectively infinite).
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            token: BearerToken::new(value, Duration::from_secs(u64::MAX / 2)),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn token(&self) -> crate::Result<BearerToken> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_does_not_need_refresh() {
        let token = BearerToken::new("abc", Duration::from_secs(3600));
        assert!(!token.needs_refresh());
    }

    #[test]
    fn token_within_safety_margin_needs_refresh() {
        let mut token = BearerToken::new("abc", Duration::from_secs(30));
        token.issued_at = Instant::now() - Duration::from_secs(1);
        assert!(token.needs_refresh());
    }

    #[tokio::test]
    async fn static_provider_returns_same_value() {
        let provider = StaticTokenProvider::new("xyz");
        let token = provider.token().await.unwrap();
        assert_eq!(token.value, "xyz");
        assert!(!token.needs_refresh());
    }
}
