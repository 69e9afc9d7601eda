//! Room aggregate entity.
//!
//! A Room is one breakout group of one event. Membership is recorded by
//! user identity rather than connection id so it survives reconnects.
//! Rooms are never deleted; ending a breakout only clears `active`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, RoomId, Timestamp, UserId};

/// Room aggregate - a persisted breakout sub-group.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `members` contains no duplicates
/// - Once inactive, a room stays inactive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    id: RoomId,
    event_id: EventId,
    index: u32,
    members: BTreeSet<UserId>,
    active: bool,
    created_at: Timestamp,
}

impl Room {
    /// Create a new active room for one partition bucket.
    pub fn new(event_id: EventId, index: u32, members: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            id: RoomId::new(),
            event_id,
            index,
            members: members.into_iter().collect(),
            active: true,
            created_at: Timestamp::now(),
        }
    }

    /// Reconstitute a room from persistence (no validation).
    pub fn reconstitute(
        id: RoomId,
        event_id: EventId,
        index: u32,
        members: BTreeSet<UserId>,
        active: bool,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            event_id,
            index,
            members,
            active,
            created_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    /// Zero-based position of this room within its breakout.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn members(&self) -> &BTreeSet<UserId> {
        &self.members
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a member. Returns false if already present.
    pub fn add_member(&mut self, user_id: UserId) -> bool {
        self.members.insert(user_id)
    }

    /// Removes a member. Returns false if absent.
    pub fn remove_member(&mut self, user_id: &UserId) -> bool {
        self.members.remove(user_id)
    }

    /// Marks the room as ended.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
