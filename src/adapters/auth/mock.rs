//! Mock identity verifier for tests and local development.
//!
//! # Example
//!
//! ```ignore
//! let verifier = MockIdentityVerifier::new()
//!     .with_test_user("token-a", UserId::new("user-a")?);
//!
//! let user = verifier.verify(&ConnectionCredentials::bearer("token-a")).await?;
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::{ConnectionCredentials, IdentityVerifier};

/// Maps tokens to users. Unknown tokens yield `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockIdentityVerifier {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// When set, every verification fails with this error.
    force_error: RwLock<Option<AuthError>>,
}

impl MockIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a token for a user with generated email and display name.
    pub fn with_test_user(self, token: impl Into<String>, user_id: UserId) -> Self {
        let user = AuthenticatedUser::new(
            user_id.clone(),
            format!("{}@test.example.com", user_id),
            Some(format!("Test User {}", user_id)),
        );
        self.with_user(token, user)
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *self
            .force_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *self
            .force_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user);
    }

    pub fn remove_token(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}

#[async_trait]
impl IdentityVerifier for MockIdentityVerifier {
    async fn verify(
        &self,
        credentials: &ConnectionCredentials,
    ) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        let token = credentials.token()?;
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> MockIdentityVerifier {
        MockIdentityVerifier::new().with_test_user("tok", UserId::new("u-1").unwrap())
    }

    #[tokio::test]
    async fn known_token_resolves_user() {
        let user = verifier()
            .verify(&ConnectionCredentials::bearer("tok"))
            .await
            .unwrap();
        assert_eq!(user.id.as_str(), "u-1");
        assert_eq!(user.email, "u-1@test.example.com");
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let result = verifier().verify(&ConnectionCredentials::bearer("nope")).await;
        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn missing_token_is_reported() {
        let result = verifier().verify(&ConnectionCredentials::anonymous()).await;
        assert_eq!(result, Err(AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn forced_error_wins_until_cleared() {
        let verifier = verifier().with_error(AuthError::service_unavailable("down"));
        let creds = ConnectionCredentials::bearer("tok");

        assert!(verifier.verify(&creds).await.unwrap_err().is_transient());
        verifier.clear_error();
        assert!(verifier.verify(&creds).await.is_ok());
    }

    #[tokio::test]
    async fn removed_token_stops_working() {
        let verifier = verifier();
        verifier.remove_token("tok");
        assert!(verifier.verify(&ConnectionCredentials::bearer("tok")).await.is_err());
    }
}
