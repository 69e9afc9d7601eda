//! EndBreakoutHandler - Deactivates an event's rooms and returns everyone
//! to the main event scope.

use std::sync::Arc;

use crate::domain::breakout::BreakoutError;
use crate::domain::foundation::{
    BreakoutEnded, CommandMetadata, EventEnvelope, EventId, LiveEvent, ModeratorGrant, RoomId,
    Scope,
};
use crate::ports::{ConnectionRegistry, EventPublisher, RoomRepository};

use super::{publish_best_effort, EventLocks};

#[derive(Debug, Clone)]
pub struct EndBreakoutCommand {
    pub event_id: EventId,
}

#[derive(Debug, Clone, Default)]
pub struct EndBreakoutResult {
    pub room_ids: Vec<RoomId>,
    pub deactivated: u64,
    /// Connections removed from room scopes.
    pub cleared_connections: usize,
}

impl EndBreakoutResult {
    /// True when no breakout was running.
    pub fn was_noop(&self) -> bool {
        self.room_ids.is_empty()
    }
}

pub struct EndBreakoutHandler {
    registry: Arc<dyn ConnectionRegistry>,
    rooms: Arc<dyn RoomRepository>,
    publisher: Arc<dyn EventPublisher>,
    locks: Arc<EventLocks>,
}

impl EndBreakoutHandler {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        rooms: Arc<dyn RoomRepository>,
        publisher: Arc<dyn EventPublisher>,
        locks: Arc<EventLocks>,
    ) -> Self {
        Self {
            registry,
            rooms,
            publisher,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: EndBreakoutCommand,
        grant: &ModeratorGrant,
        metadata: CommandMetadata,
    ) -> Result<EndBreakoutResult, BreakoutError> {
        grant.authorize(&cmd.event_id)?;

        let _guard = self.locks.lock(&cmd.event_id).await;

        let active = self.rooms.find_active_by_event(&cmd.event_id).await?;
        if active.is_empty() {
            tracing::debug!(event_id = %cmd.event_id, "No active breakout to end");
            return Ok(EndBreakoutResult::default());
        }

        // Storage first: a failure here leaves the registry untouched.
        let deactivated = self.rooms.deactivate_by_event(&cmd.event_id).await?;

        let room_ids: Vec<RoomId> = active.iter().map(|r| *r.id()).collect();
        let cleared_connections = room_ids
            .iter()
            .map(|id| self.registry.clear_scope(&Scope::Room(*id)).len())
            .sum();

        tracing::info!(
            event_id = %cmd.event_id,
            rooms = room_ids.len(),
            cleared_connections,
            moderator = %grant.user_id(),
            "Breakout ended"
        );

        let envelope = EventEnvelope::new(LiveEvent::BreakoutEnded(BreakoutEnded {
            event_id: cmd.event_id,
            room_ids: room_ids.clone(),
        }))
        .with_command_metadata(&metadata)
        .with_user_id(grant.user_id().to_string());
        publish_best_effort(self.publisher.as_ref(), envelope).await;

        Ok(EndBreakoutResult {
            room_ids,
            deactivated,
            cleared_connections,
        })
    }
}
