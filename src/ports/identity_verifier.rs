//! Identity verification port.
//!
//! Turns the credentials a connecting client presents into a verified user.
//! Provider-agnostic: the JWKS adapter handles any OIDC issuer and the mock
//! adapter serves tests.
//!
//! All implementations MUST validate:
//! - **Issuer (iss)**: token comes from the expected provider
//! - **Audience (aud)**: token was minted for this service
//! - **Expiry (exp)**: token is not expired

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Credentials presented on connect.
///
/// Browsers cannot set headers on a websocket upgrade, so the token usually
/// arrives as a query parameter.
#[derive(Debug, Clone)]
pub struct ConnectionCredentials {
    token: Option<SecretString>,
}

impl ConnectionCredentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::new(token.into())),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// Raw token, or `MissingCredentials` when none (or a blank one) was sent.
    pub fn token(&self) -> Result<&str, AuthError> {
        match &self.token {
            Some(token) if !token.expose_secret().trim().is_empty() => {
                Ok(token.expose_secret().as_str())
            }
            _ => Err(AuthError::MissingCredentials),
        }
    }
}

/// Verifies connection credentials and extracts the user.
///
/// # Contract
///
/// - `AuthError::MissingCredentials` when no token was presented
/// - `AuthError::InvalidToken` for malformed or badly signed tokens
/// - `AuthError::TokenExpired` for expired tokens
/// - `AuthError::ServiceUnavailable` for transient provider errors
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(
        &self,
        credentials: &ConnectionCredentials,
    ) -> Result<AuthenticatedUser, AuthError>;
}
