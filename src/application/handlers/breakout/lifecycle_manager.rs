//! RoomLifecycleManager - Single entry point for breakout operations.
//!
//! Bundles the four lifecycle handlers over one set of shared dependencies
//! so that they all serialize on the same [`EventLocks`].

use std::sync::Arc;

use crate::application::handlers::presence::IdentityResolver;
use crate::domain::breakout::{BreakoutError, Room, RoomPartitioner};
use crate::domain::foundation::{CommandMetadata, EventId, ModeratorGrant, RoomId, UserId};
use crate::ports::{ConnectionRegistry, EventPublisher, RoomRepository};

use super::{
    ChangeRoomCommand, ChangeRoomHandler, ChangeRoomOutcome, EndBreakoutCommand,
    EndBreakoutHandler, EndBreakoutResult, EventLocks, FindMyRoomHandler, FindMyRoomQuery,
    StartBreakoutCommand, StartBreakoutHandler, StartBreakoutResult,
};

/// Shared dependencies of the lifecycle handlers.
#[derive(Clone)]
pub struct LifecycleDeps {
    pub registry: Arc<dyn ConnectionRegistry>,
    pub resolver: Arc<IdentityResolver>,
    pub rooms: Arc<dyn RoomRepository>,
    pub publisher: Arc<dyn EventPublisher>,
    pub partitioner: Arc<RoomPartitioner>,
    pub locks: Arc<EventLocks>,
    /// Upper bound on rooms per breakout, on top of the live-count bound.
    pub max_rooms: Option<usize>,
}

pub struct RoomLifecycleManager {
    start: StartBreakoutHandler,
    end: EndBreakoutHandler,
    change: ChangeRoomHandler,
    find: FindMyRoomHandler,
    locks: Arc<EventLocks>,
}

impl RoomLifecycleManager {
    pub fn new(deps: LifecycleDeps) -> Self {
        Self {
            start: StartBreakoutHandler::new(
                deps.registry.clone(),
                deps.resolver.clone(),
                deps.rooms.clone(),
                deps.publisher.clone(),
                deps.partitioner,
                deps.locks.clone(),
            )
            .with_max_rooms(deps.max_rooms),
            end: EndBreakoutHandler::new(
                deps.registry.clone(),
                deps.rooms.clone(),
                deps.publisher.clone(),
                deps.locks.clone(),
            ),
            change: ChangeRoomHandler::new(
                deps.registry,
                deps.resolver,
                deps.rooms.clone(),
                deps.publisher,
                deps.locks.clone(),
            ),
            find: FindMyRoomHandler::new(deps.rooms),
            locks: deps.locks,
        }
    }

    pub async fn start(
        &self,
        event_id: EventId,
        room_count: usize,
        grant: &ModeratorGrant,
        metadata: CommandMetadata,
    ) -> Result<StartBreakoutResult, BreakoutError> {
        self.start
            .handle(
                StartBreakoutCommand {
                    event_id,
                    room_count,
                },
                grant,
                metadata,
            )
            .await
    }

    pub async fn end(
        &self,
        event_id: EventId,
        grant: &ModeratorGrant,
        metadata: CommandMetadata,
    ) -> Result<EndBreakoutResult, BreakoutError> {
        self.end
            .handle(EndBreakoutCommand { event_id }, grant, metadata)
            .await
    }

    pub async fn change_room(
        &self,
        cmd: ChangeRoomCommand,
        grant: &ModeratorGrant,
        metadata: CommandMetadata,
    ) -> Result<ChangeRoomOutcome, BreakoutError> {
        self.change.handle(cmd, grant, metadata).await
    }

    pub async fn find_my_room(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Room>, BreakoutError> {
        self.find
            .handle(FindMyRoomQuery { event_id, user_id })
            .await
    }

    /// Like [`find_my_room`](Self::find_my_room), but holds the event lock
    /// while `apply` places the connection, so a concurrent end cannot clear
    /// the room in between. `apply` returns false when the connection could
    /// not be placed, and the result is then `None`.
    pub async fn rejoin<F>(
        &self,
        event_id: EventId,
        user_id: UserId,
        apply: F,
    ) -> Result<Option<Room>, BreakoutError>
    where
        F: FnOnce(&RoomId) -> bool,
    {
        let _guard = self.locks.lock(&event_id).await;
        let room = self.find_my_room(event_id, user_id).await?;
        Ok(room.filter(|room| apply(room.id())))
    }
}
