//! ChangeRoomHandler - Moves one user between two rooms of a running
//! breakout.

use std::sync::Arc;

use crate::application::handlers::presence::IdentityResolver;
use crate::domain::breakout::{BreakoutError, Room};
use crate::domain::foundation::{
    CommandMetadata, ConnectionId, EventEnvelope, EventId, LiveEvent, ModeratorGrant,
    RoomChanged, RoomId, Scope, UserId,
};
use crate::ports::{ConnectionRegistry, EventPublisher, RoomRepository};

use super::{publish_best_effort, EventLocks};

#[derive(Debug, Clone)]
pub struct ChangeRoomCommand {
    pub event_id: EventId,
    pub from_room: RoomId,
    pub to_room: RoomId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRoomOutcome {
    /// Membership was moved along with these live connections.
    Moved { connections: Vec<ConnectionId> },
    /// The user has no live connection in the source room. Nothing changed.
    NotConnected,
}

pub struct ChangeRoomHandler {
    registry: Arc<dyn ConnectionRegistry>,
    resolver: Arc<IdentityResolver>,
    rooms: Arc<dyn RoomRepository>,
    publisher: Arc<dyn EventPublisher>,
    locks: Arc<EventLocks>,
}

impl ChangeRoomHandler {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        resolver: Arc<IdentityResolver>,
        rooms: Arc<dyn RoomRepository>,
        publisher: Arc<dyn EventPublisher>,
        locks: Arc<EventLocks>,
    ) -> Self {
        Self {
            registry,
            resolver,
            rooms,
            publisher,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: ChangeRoomCommand,
        grant: &ModeratorGrant,
        metadata: CommandMetadata,
    ) -> Result<ChangeRoomOutcome, BreakoutError> {
        grant.authorize(&cmd.event_id)?;
        if cmd.from_room == cmd.to_room {
            return Err(BreakoutError::validation(
                "Source and target room must differ",
            ));
        }

        let _guard = self.locks.lock(&cmd.event_id).await;

        // 1. Both rooms must be active rooms of this event
        let mut from = self.active_room(&cmd.event_id, &cmd.from_room).await?;
        let mut to = self.active_room(&cmd.event_id, &cmd.to_room).await?;
        if !from.contains(&cmd.user_id) {
            return Err(BreakoutError::NoActiveAssignment {
                event_id: cmd.event_id,
                user_id: cmd.user_id,
            });
        }

        // 2. Find the user's live connections in the source room
        let candidates = self.registry.members(&Scope::Room(cmd.from_room));
        let resolved = self.resolver.resolve_identities(&candidates).await?;
        let connections: Vec<ConnectionId> = candidates
            .into_iter()
            .filter(|c| resolved.get(c) == Some(&cmd.user_id))
            .collect();
        if connections.is_empty() {
            tracing::info!(
                event_id = %cmd.event_id,
                user_id = %cmd.user_id,
                from_room = %cmd.from_room,
                "Room change skipped, user not connected"
            );
            return Ok(ChangeRoomOutcome::NotConnected);
        }

        // 3. Persist membership on both rooms
        let from_before = from.clone();
        from.remove_member(&cmd.user_id);
        to.add_member(cmd.user_id.clone());

        self.rooms.update_members(&from).await?;
        if let Err(e) = self.rooms.update_members(&to).await {
            tracing::error!(
                room_id = %cmd.to_room,
                error = %e,
                "Target room update failed, restoring source room"
            );
            if let Err(restore) = self.rooms.update_members(&from_before).await {
                tracing::error!(
                    room_id = %cmd.from_room,
                    error = %restore,
                    "Source room restore failed"
                );
                return Err(BreakoutError::persistence(format!(
                    "{}; restore failed: {}",
                    e, restore
                )));
            }
            return Err(BreakoutError::persistence(e.to_string()));
        }

        // 4. Move the connections that are still live
        let event_scope = Scope::Event(cmd.event_id.clone());
        let connections: Vec<ConnectionId> = connections
            .into_iter()
            .filter(|&connection| {
                let placed = self
                    .registry
                    .assign_room_if_in(connection, &event_scope, cmd.to_room);
                if !placed {
                    tracing::debug!(
                        connection_id = %connection,
                        "Connection left during room change, not moved"
                    );
                }
                placed
            })
            .collect();

        tracing::info!(
            event_id = %cmd.event_id,
            user_id = %cmd.user_id,
            from_room = %cmd.from_room,
            to_room = %cmd.to_room,
            connections = connections.len(),
            "User moved between rooms"
        );

        let envelope = EventEnvelope::new(LiveEvent::RoomChanged(RoomChanged {
            event_id: cmd.event_id,
            from_room: cmd.from_room,
            to_room: cmd.to_room,
            user_id: cmd.user_id,
            connections: connections.clone(),
        }))
        .with_command_metadata(&metadata)
        .with_user_id(grant.user_id().to_string());
        publish_best_effort(self.publisher.as_ref(), envelope).await;

        Ok(ChangeRoomOutcome::Moved { connections })
    }

    async fn active_room(&self, event_id: &EventId, room_id: &RoomId) -> Result<Room, BreakoutError> {
        match self.rooms.find_by_id(room_id).await? {
            Some(room) if room.is_active() && room.event_id() == event_id => Ok(room),
            _ => Err(BreakoutError::RoomNotFound(*room_id)),
        }
    }
}
