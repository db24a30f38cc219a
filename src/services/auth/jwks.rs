//! JWKS fetching and caching for platform token verification.

use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use tokio::sync::RwLock;

use super::AuthError;

/// Cached key set refreshed from the issuer's JWKS endpoint. An unknown
/// `kid` forces one refresh before failing, so key rotation does not
/// require a restart.
pub struct JwksCache {
    url: String,
    client: reqwest::Client,
    refresh_after: Duration,
    inner: RwLock<Option<CachedSet>>,
}

struct CachedSet {
    fetched_at: Instant,
    keys: JwkSet,
}

impl JwksCache {
    pub fn new(url: impl Into<String>, refresh_after: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            refresh_after,
            inner: RwLock::new(None),
        }
    }

    /// Resolve the decoding key for a token's `kid`.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.lookup(kid).await? {
            return Ok(key);
        }

        self.refresh().await?;

        match self.lookup(kid).await? {
            Some(key) => Ok(key),
            None => Err(AuthError::UnknownKey(kid.to_string())),
        }
    }

    async fn lookup(&self, kid: &str) -> Result<Option<DecodingKey>, AuthError> {
        let guard = self.inner.read().await;
        let Some(cached) = guard.as_ref() else {
            return Ok(None);
        };
        if cached.fetched_at.elapsed() > self.refresh_after {
            return Ok(None);
        }
        match cached.keys.find(kid) {
            Some(jwk) => DecodingKey::from_jwk(jwk)
                .map(Some)
                .map_err(|e| AuthError::Jwks(e.to_string())),
            None => Ok(None),
        }
    }

    async fn refresh(&self) -> Result<(), AuthError> {
        if self.url.is_empty() {
            return Err(AuthError::Jwks("no JWKS url configured".to_string()));
        }
        let keys: JwkSet = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::Jwks(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        tracing::debug!(url = %self.url, key_count = keys.keys.len(), "Refreshed JWKS");
        *self.inner.write().await = Some(CachedSet { fetched_at: Instant::now(), keys });
        Ok(())
    }
}
