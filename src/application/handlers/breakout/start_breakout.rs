//! StartBreakoutHandler - Splits an event's live connections into rooms.

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;

use crate::application::handlers::presence::IdentityResolver;
use crate::domain::breakout::{
    max_room_count, validate_room_count, BreakoutError, Room, RoomPartitioner,
};
use crate::domain::foundation::{
    BreakoutStarted, CommandMetadata, ConnectionId, DomainError, EventEnvelope, EventId,
    LiveEvent, ModeratorGrant, RoomAssignment, RoomId, Scope, UserId,
};
use crate::ports::{ConnectionRegistry, EventPublisher, RoomRepository};

use super::{publish_best_effort, EventLocks};

/// Command to start a breakout.
#[derive(Debug, Clone)]
pub struct StartBreakoutCommand {
    pub event_id: EventId,
    pub room_count: usize,
}

/// One created room and the live connections placed in it.
#[derive(Debug, Clone)]
pub struct StartedRoom {
    pub room: Room,
    pub connections: Vec<ConnectionId>,
}

#[derive(Debug, Clone)]
pub struct StartBreakoutResult {
    pub rooms: Vec<StartedRoom>,
    /// Connections placed in a room without a resolved identity.
    pub unresolved: usize,
}

impl StartBreakoutResult {
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|r| *r.room.id()).collect()
    }
}

pub struct StartBreakoutHandler {
    registry: Arc<dyn ConnectionRegistry>,
    resolver: Arc<IdentityResolver>,
    rooms: Arc<dyn RoomRepository>,
    publisher: Arc<dyn EventPublisher>,
    partitioner: Arc<RoomPartitioner>,
    locks: Arc<EventLocks>,
    max_rooms: Option<usize>,
}

impl StartBreakoutHandler {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        resolver: Arc<IdentityResolver>,
        rooms: Arc<dyn RoomRepository>,
        publisher: Arc<dyn EventPublisher>,
        partitioner: Arc<RoomPartitioner>,
        locks: Arc<EventLocks>,
    ) -> Self {
        Self {
            registry,
            resolver,
            rooms,
            publisher,
            partitioner,
            locks,
            max_rooms: None,
        }
    }

    /// Caps the room count of any single breakout.
    pub fn with_max_rooms(mut self, max_rooms: Option<usize>) -> Self {
        self.max_rooms = max_rooms;
        self
    }

    pub async fn handle(
        &self,
        cmd: StartBreakoutCommand,
        grant: &ModeratorGrant,
        metadata: CommandMetadata,
    ) -> Result<StartBreakoutResult, BreakoutError> {
        grant.authorize(&cmd.event_id)?;

        let guard = self.locks.lock(&cmd.event_id).await;

        if !self.rooms.find_active_by_event(&cmd.event_id).await?.is_empty() {
            return Err(BreakoutError::BreakoutAlreadyActive(cmd.event_id));
        }

        // 1. Snapshot live connections and check the room count before any write
        let event_scope = Scope::Event(cmd.event_id.clone());
        let live = self.registry.members(&event_scope);
        validate_room_count(cmd.room_count, live.len())?;
        if let Some(cap) = self.max_rooms.filter(|cap| cmd.room_count > *cap) {
            return Err(BreakoutError::InvalidRoomCount {
                requested: cmd.room_count,
                live: live.len(),
                max: cap.min(max_room_count(live.len())),
            });
        }

        // 2. Resolve identities and partition
        let identities = self.resolver.resolve_identities(&live).await?;
        let buckets = self.partitioner.partition(live, cmd.room_count)?;

        // 3. Persist every room. Until committed, `pending` undoes the inserts,
        //    also when this future is dropped mid-way.
        let mut pending = PendingRooms::new(self.rooms.clone(), cmd.event_id.clone(), guard);
        let mut started = Vec::with_capacity(buckets.len());
        let mut unresolved = 0;
        for (index, bucket) in buckets.into_iter().enumerate() {
            let members: Vec<UserId> = bucket
                .iter()
                .filter_map(|c| identities.get(c).cloned())
                .collect();
            unresolved += bucket.len() - members.len();

            let room = Room::new(cmd.event_id.clone(), index as u32, members);
            if let Err(e) = self.rooms.insert(&room).await {
                tracing::error!(
                    event_id = %cmd.event_id,
                    room_index = index,
                    error = %e,
                    "Room insert failed, rolling back breakout start"
                );
                if let Err(rollback) = pending.roll_back().await {
                    return Err(BreakoutError::persistence(format!(
                        "{}; rollback failed: {}",
                        e, rollback
                    )));
                }
                return Err(BreakoutError::persistence(e.to_string()));
            }
            pending.inserted(*room.id());
            started.push(StartedRoom {
                room,
                connections: bucket,
            });
        }
        pending.commit();

        // 4. Move connections into their rooms, skipping any that left meanwhile
        for started_room in &mut started {
            let room_id = *started_room.room.id();
            started_room.connections.retain(|&connection| {
                self.registry
                    .assign_room_if_in(connection, &event_scope, room_id)
            });
        }

        tracing::info!(
            event_id = %cmd.event_id,
            rooms = started.len(),
            unresolved,
            moderator = %grant.user_id(),
            "Breakout started"
        );

        // 5. Announce
        let event = BreakoutStarted {
            event_id: cmd.event_id,
            rooms: started
                .iter()
                .map(|s| RoomAssignment {
                    room_id: *s.room.id(),
                    index: s.room.index(),
                })
                .collect(),
        };
        let envelope = EventEnvelope::new(LiveEvent::BreakoutStarted(event))
            .with_command_metadata(&metadata)
            .with_user_id(grant.user_id().to_string());
        publish_best_effort(self.publisher.as_ref(), envelope).await;

        Ok(StartBreakoutResult {
            rooms: started,
            unresolved,
        })
    }
}

/// Rooms inserted by a start that has not committed yet.
///
/// Owns the event lock. Dropped uncommitted, it deactivates the rooms on a
/// background task that keeps holding the lock until they are inactive.
struct PendingRooms {
    rooms: Arc<dyn RoomRepository>,
    event_id: EventId,
    inserted: Vec<RoomId>,
    lock: Option<OwnedMutexGuard<()>>,
    settled: bool,
}

impl PendingRooms {
    fn new(rooms: Arc<dyn RoomRepository>, event_id: EventId, lock: OwnedMutexGuard<()>) -> Self {
        Self {
            rooms,
            event_id,
            inserted: Vec::new(),
            lock: Some(lock),
            settled: false,
        }
    }

    fn inserted(&mut self, room_id: RoomId) {
        self.inserted.push(room_id);
    }

    fn commit(&mut self) {
        self.settled = true;
    }

    async fn roll_back(&mut self) -> Result<(), DomainError> {
        self.settled = true;
        let inserted = std::mem::take(&mut self.inserted);
        deactivate_all(self.rooms.as_ref(), &self.event_id, &inserted).await
    }
}

impl Drop for PendingRooms {
    fn drop(&mut self) {
        if self.settled || self.inserted.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                event_id = %self.event_id,
                rooms = self.inserted.len(),
                "Breakout start abandoned outside a runtime, rooms left active"
            );
            return;
        };
        tracing::warn!(
            event_id = %self.event_id,
            rooms = self.inserted.len(),
            "Breakout start abandoned, deactivating inserted rooms"
        );

        let rooms = Arc::clone(&self.rooms);
        let event_id = self.event_id.clone();
        let inserted = std::mem::take(&mut self.inserted);
        let lock = self.lock.take();
        runtime.spawn(async move {
            let _lock = lock;
            if let Err(e) = deactivate_all(rooms.as_ref(), &event_id, &inserted).await {
                tracing::error!(
                    event_id = %event_id,
                    error = %e,
                    "Could not deactivate rooms of abandoned breakout start"
                );
            }
        });
    }
}

/// Deactivates one start attempt's rooms, falling back to the bulk update.
///
/// While a start holds the event lock no other room of the event is active,
/// so the bulk update touches only this attempt's rooms.
async fn deactivate_all(
    rooms: &dyn RoomRepository,
    event_id: &EventId,
    inserted: &[RoomId],
) -> Result<(), DomainError> {
    let mut failed = false;
    for room_id in inserted {
        if let Err(e) = rooms.deactivate(room_id).await {
            tracing::warn!(room_id = %room_id, error = %e, "Room deactivation failed");
            failed = true;
        }
    }
    if failed {
        rooms.deactivate_by_event(event_id).await?;
    }
    Ok(())
}
