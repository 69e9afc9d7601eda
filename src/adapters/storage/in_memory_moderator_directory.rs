//! In-memory ModeratorDirectory.
//!
//! Moderators are seeded at startup (or by tests). Event ownership and
//! moderator lists live in the event management service; this adapter is
//! the stand-in until that lookup is wired up.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, EventId, UserId};
use crate::ports::ModeratorDirectory;

#[derive(Debug, Clone, Default)]
pub struct InMemoryModeratorDirectory {
    moderators: Arc<RwLock<HashMap<EventId, HashSet<UserId>>>>,
    global: Arc<RwLock<HashSet<UserId>>>,
}

impl InMemoryModeratorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory where the given users moderate every event.
    pub fn with_global_moderators(users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            moderators: Arc::default(),
            global: Arc::new(RwLock::new(users.into_iter().collect())),
        }
    }

    pub async fn add_moderator(&self, event_id: EventId, user_id: UserId) {
        self.moderators
            .write()
            .await
            .entry(event_id)
            .or_default()
            .insert(user_id);
    }
}

#[async_trait]
impl ModeratorDirectory for InMemoryModeratorDirectory {
    async fn is_moderator(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<bool, DomainError> {
        if self.global.read().await.contains(user_id) {
            return Ok(true);
        }
        Ok(self
            .moderators
            .read()
            .await
            .get(event_id)
            .is_some_and(|users| users.contains(user_id)))
    }
}
