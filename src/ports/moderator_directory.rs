//! Moderator lookup used by the transport layer to mint `ModeratorGrant`s.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId, ModeratorGrant, UserId};

/// Answers whether a user moderates (or owns) an event.
#[async_trait]
pub trait ModeratorDirectory: Send + Sync {
    async fn is_moderator(&self, event_id: &EventId, user_id: &UserId)
        -> Result<bool, DomainError>;

    /// Grant for `user_id` on `event_id`, or `None` if they may not moderate.
    async fn grant_for(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Option<ModeratorGrant>, DomainError> {
        if self.is_moderator(event_id, user_id).await? {
            Ok(Some(ModeratorGrant::new(user_id.clone(), event_id.clone())))
        } else {
            Ok(None)
        }
    }
}
