//! Typed authorization results passed into lifecycle operations.
//!
//! The transport layer decides whether a user may moderate an event and
//! records the decision as a `ModeratorGrant`. Lifecycle handlers receive the
//! grant as an argument instead of inspecting request state.

use super::{DomainError, ErrorCode, EventId, UserId};

/// Proof that `user_id` may run breakout operations for `event_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorGrant {
    user_id: UserId,
    event_id: EventId,
}

impl ModeratorGrant {
    /// Issues a grant. Callers must have checked moderator/owner status first.
    pub fn new(user_id: UserId, event_id: EventId) -> Self {
        Self { user_id, event_id }
    }

    /// The moderator the grant was issued to.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The event the grant covers.
    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    /// Fails with `Forbidden` unless the grant covers `event_id`.
    pub fn authorize(&self, event_id: &EventId) -> Result<(), DomainError> {
        if &self.event_id == event_id {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                granted_event = %self.event_id,
                requested_event = %event_id,
                "Moderator grant does not cover requested event"
            );
            Err(DomainError::new(
                ErrorCode::Forbidden,
                format!("User {} may not moderate event {}", self.user_id, event_id),
            ))
        }
    }
}
