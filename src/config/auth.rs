//! Authentication configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::auth::JwksConfig;
use crate::domain::foundation::UserId;

/// Token verification and moderator settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// OIDC issuer URL; tokens must carry it as `iss`
    pub issuer: String,

    /// Expected audience for tokens
    pub audience: String,

    /// Key set URL, when not at the issuer's well-known path
    pub jwks_url: Option<String>,

    /// JWKS cache TTL in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,

    /// Users allowed to moderate every event (comma-separated user ids)
    pub moderators: Option<String>,
}

impl AuthConfig {
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    /// Verifier settings derived from this section.
    pub fn jwks_config(&self) -> JwksConfig {
        let config = JwksConfig::new(&self.issuer, &self.audience)
            .with_cache_duration(self.jwks_cache_ttl());
        match &self.jwks_url {
            Some(url) => config.with_jwks_url(url),
            None => config,
        }
    }

    /// Parsed moderator list. Blank entries are skipped.
    pub fn moderator_ids(&self) -> Vec<UserId> {
        self.moderators
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|id| UserId::new(id.trim()).ok())
            .collect()
    }

    /// Validate authentication configuration
    ///
    /// In production, requires HTTPS for the issuer.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.issuer.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__ISSUER"));
        }
        if self.audience.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__AUDIENCE"));
        }
        if *environment == Environment::Production && !self.issuer.starts_with("https://") {
            return Err(ValidationError::IssuerMustBeHttps);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            jwks_url: None,
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
            moderators: None,
        }
    }
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}
