//! In-memory IdentityRepository for development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthenticatedUser, ConnectionId, DomainError, UserId};
use crate::domain::presence::Identity;
use crate::ports::IdentityRepository;

/// In-memory identity storage keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityRepository {
    identities: Arc<RwLock<HashMap<UserId, Identity>>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn find(&self, user_id: &UserId) -> Option<Identity> {
        self.identities.read().await.get(user_id).cloned()
    }

    fn check_writes(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated identity write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn add_live_connection(
        &self,
        user: &AuthenticatedUser,
        connection_id: ConnectionId,
    ) -> Result<(), DomainError> {
        self.check_writes()?;
        let mut identities = self.identities.write().await;
        let identity = identities
            .entry(user.id.clone())
            .or_insert_with(|| Identity::from_user(user));
        identity.refresh_profile(user);
        identity.add_connection(connection_id);
        Ok(())
    }

    async fn remove_live_connection(
        &self,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Result<(), DomainError> {
        self.check_writes()?;
        if let Some(identity) = self.identities.write().await.get_mut(user_id) {
            identity.remove_connection(&connection_id);
        }
        Ok(())
    }

    async fn find_by_connection_ids(
        &self,
        connection_ids: &[ConnectionId],
    ) -> Result<HashMap<ConnectionId, UserId>, DomainError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated identity read failure"));
        }
        let identities = self.identities.read().await;
        let mut resolved = HashMap::new();
        for connection_id in connection_ids {
            if let Some(identity) = identities
                .values()
                .find(|identity| identity.has_connection(connection_id))
            {
                resolved.insert(*connection_id, identity.user_id().clone());
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new(id).unwrap(), format!("{}@example.com", id), None)
    }

    #[tokio::test]
    async fn add_is_deduplicated() {
        let repo = InMemoryIdentityRepository::new();
        let conn = ConnectionId::new();

        repo.add_live_connection(&user("a"), conn).await.unwrap();
        repo.add_live_connection(&user("a"), conn).await.unwrap();

        let identity = repo.find(&UserId::new("a").unwrap()).await.unwrap();
        assert_eq!(identity.live_connections().len(), 1);
    }

    #[tokio::test]
    async fn unresolved_connections_are_left_out() {
        let repo = InMemoryIdentityRepository::new();
        let (known, unknown) = (ConnectionId::new(), ConnectionId::new());
        repo.add_live_connection(&user("a"), known).await.unwrap();

        let resolved = repo.find_by_connection_ids(&[known, unknown]).await.unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[&known].as_str(), "a");
    }

    #[tokio::test]
    async fn remove_for_unknown_user_is_ok() {
        let repo = InMemoryIdentityRepository::new();
        let result = repo
            .remove_live_connection(&UserId::new("ghost").unwrap(), ConnectionId::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn removed_connection_no_longer_resolves() {
        let repo = InMemoryIdentityRepository::new();
        let conn = ConnectionId::new();
        repo.add_live_connection(&user("a"), conn).await.unwrap();
        repo.remove_live_connection(&UserId::new("a").unwrap(), conn)
            .await
            .unwrap();

        assert!(repo.find_by_connection_ids(&[conn]).await.unwrap().is_empty());
    }
}
