//! OIDC adapter validating connection tokens against a JWKS.
//!
//! This adapter implements the `IdentityVerifier` port for any OIDC
//! provider that publishes its signing keys. It validates JWTs by:
//!
//! 1. Fetching the JWKS (cached, refreshed after a TTL)
//! 2. Validating the JWT signature against the matching key
//! 3. Validating issuer, audience, and expiry claims
//! 4. Mapping claims to the domain `AuthenticatedUser` type
//!
//! # Example
//!
//! ```ignore
//! let config = JwksConfig::new("https://auth.example.com", "townhall-presence");
//! let verifier = JwksIdentityVerifier::new(config)?;
//! let user = verifier.verify(&ConnectionCredentials::bearer("eyJ...")).await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::{ConnectionCredentials, IdentityVerifier};

const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(3600);

/// Configuration for the JWKS verifier.
#[derive(Debug, Clone)]
pub struct JwksConfig {
    /// The issuer URL. Also the JWT `iss` value tokens must carry.
    pub issuer_url: String,

    /// Expected audience claim in JWTs.
    pub audience: String,

    /// Explicit key set URL. Defaults to `{issuer}/.well-known/jwks.json`.
    pub jwks_url: Option<String>,

    /// How long to cache the key set before refetching. Defaults to 1 hour.
    pub jwks_cache_duration: Option<Duration>,
}

impl JwksConfig {
    pub fn new(issuer_url: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            audience: audience.into(),
            jwks_url: None,
            jwks_cache_duration: None,
        }
    }

    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = Some(duration);
        self
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = Some(url.into());
        self
    }

    fn jwks_url(&self) -> String {
        self.jwks_url.clone().unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                self.issuer_url.trim_end_matches('/')
            )
        })
    }
}

/// JWT claims the verifier reads.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    #[serde(default)]
    aud: Audience,
    exp: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
}

/// Audience can be a single string or array of strings in JWTs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
enum Audience {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::None => false,
            Audience::Single(s) => s == expected,
            Audience::Multiple(v) => v.iter().any(|s| s == expected),
        }
    }
}

struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
    cache_duration: Duration,
}

impl JwksCache {
    fn new(jwks: JwkSet, cache_duration: Duration) -> Self {
        Self {
            jwks,
            fetched_at: Instant::now(),
            cache_duration,
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.cache_duration
    }
}

/// Production `IdentityVerifier`.
pub struct JwksIdentityVerifier {
    config: JwksConfig,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl JwksIdentityVerifier {
    /// Keys are fetched lazily on first verification, not here.
    pub fn new(config: JwksConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::service_unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        })
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.config.jwks_url();
        tracing::debug!(url = %url, "Fetching JWKS");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch JWKS");
            AuthError::service_unavailable(format!("Failed to fetch JWKS: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "JWKS endpoint returned error status");
            return Err(AuthError::service_unavailable(format!(
                "JWKS endpoint returned {}",
                status
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS");
            AuthError::service_unavailable(format!("Failed to parse JWKS: {}", e))
        })?;

        tracing::debug!(keys = jwks.keys.len(), "Fetched JWKS");
        Ok(jwks)
    }

    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if !cached.is_expired() {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;

        let duration = self
            .config
            .jwks_cache_duration
            .unwrap_or(DEFAULT_CACHE_DURATION);
        *self.jwks_cache.write().await = Some(JwksCache::new(jwks.clone(), duration));

        Ok(jwks)
    }

    fn find_decoding_key(
        &self,
        header: &jsonwebtoken::Header,
        jwks: &JwkSet,
    ) -> Result<(DecodingKey, Algorithm), AuthError> {
        let kid = header.kid.as_ref().ok_or_else(|| {
            tracing::warn!("JWT missing 'kid' header");
            AuthError::InvalidToken
        })?;

        let jwk = jwks.find(kid).ok_or_else(|| {
            tracing::warn!(kid = %kid, "No matching key found");
            AuthError::InvalidToken
        })?;

        use jsonwebtoken::jwk::KeyAlgorithm;
        let algorithm = match jwk.common.key_algorithm {
            Some(KeyAlgorithm::RS256) | None => Algorithm::RS256,
            Some(KeyAlgorithm::RS384) => Algorithm::RS384,
            Some(KeyAlgorithm::RS512) => Algorithm::RS512,
            Some(KeyAlgorithm::ES256) => Algorithm::ES256,
            Some(KeyAlgorithm::ES384) => Algorithm::ES384,
            Some(other) => {
                tracing::warn!(algorithm = ?other, "Unsupported JWK algorithm");
                return Err(AuthError::InvalidToken);
            }
        };

        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!(error = %e, "Failed to create decoding key");
            AuthError::InvalidToken
        })?;

        Ok((decoding_key, algorithm))
    }

    fn validate_token(
        &self,
        token: &str,
        decoding_key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<TokenData<Claims>, AuthError> {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.config.issuer_url]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<Claims>(token, decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::warn!(error = %e, "Token validation failed");
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl IdentityVerifier for JwksIdentityVerifier {
    async fn verify(
        &self,
        credentials: &ConnectionCredentials,
    ) -> Result<AuthenticatedUser, AuthError> {
        let token = credentials.token()?;

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode JWT header");
            AuthError::InvalidToken
        })?;

        let jwks = self.get_jwks().await?;
        let (decoding_key, algorithm) = self.find_decoding_key(&header, &jwks)?;
        let claims = self.validate_token(token, &decoding_key, algorithm)?.claims;

        if claims.iss != self.config.issuer_url || !claims.aud.contains(&self.config.audience) {
            tracing::warn!(iss = %claims.iss, aud = ?claims.aud, "Issuer or audience mismatch");
            return Err(AuthError::InvalidToken);
        }

        let user_id = UserId::new(claims.sub.as_str()).map_err(|_| AuthError::InvalidToken)?;
        let email = claims.email.ok_or_else(|| {
            tracing::warn!(user_id = %user_id, "Token missing email claim");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(
            user_id,
            email,
            claims.name.or(claims.preferred_username),
        ))
    }
}

impl std::fmt::Debug for JwksIdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksIdentityVerifier")
            .field("issuer_url", &self.config.issuer_url)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds_default_jwks_url() {
        let config = JwksConfig::new("https://auth.example.com/", "presence");
        assert_eq!(
            config.jwks_url(),
            "https://auth.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn explicit_jwks_url_wins() {
        let config = JwksConfig::new("https://auth.example.com", "presence")
            .with_jwks_url("https://auth.example.com/oauth/v2/keys");
        assert_eq!(config.jwks_url(), "https://auth.example.com/oauth/v2/keys");
    }

    #[test]
    fn audience_variants() {
        assert!(Audience::Single("a".into()).contains("a"));
        assert!(Audience::Multiple(vec!["a".into(), "b".into()]).contains("b"));
        assert!(!Audience::None.contains("a"));
    }

    #[test]
    fn jwks_cache_expires_after_duration() {
        let fresh = JwksCache::new(JwkSet { keys: vec![] }, Duration::from_secs(3600));
        assert!(!fresh.is_expired());

        let stale = JwksCache::new(JwkSet { keys: vec![] }, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        assert!(stale.is_expired());
    }

    #[tokio::test]
    async fn missing_token_is_rejected_without_network() {
        let verifier =
            JwksIdentityVerifier::new(JwksConfig::new("https://auth.invalid", "presence")).unwrap();
        let result = verifier.verify(&ConnectionCredentials::anonymous()).await;
        assert_eq!(result, Err(AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn garbage_token_fails_before_fetching_keys() {
        let verifier =
            JwksIdentityVerifier::new(JwksConfig::new("https://auth.invalid", "presence")).unwrap();
        let result = verifier
            .verify(&ConnectionCredentials::bearer("not-a-jwt"))
            .await;
        assert_eq!(result, Err(AuthError::InvalidToken));
    }
}
