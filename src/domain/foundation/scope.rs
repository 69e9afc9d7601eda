//! Broadcast scopes: the named groups connections join.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EventId, RoomId};

/// A named set of connections sharing a broadcast target.
///
/// Every connection of an event joins `Scope::Event`; while a breakout is
/// running it additionally sits in exactly one `Scope::Room`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Event-wide scope.
    Event(EventId),
    /// A single breakout room.
    Room(RoomId),
}

impl Scope {
    /// Returns the room id when this is a room scope.
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Scope::Room(id) => Some(*id),
            Scope::Event(_) => None,
        }
    }

    /// True for `Scope::Room`.
    pub fn is_room(&self) -> bool {
        matches!(self, Scope::Room(_))
    }
}

impl From<EventId> for Scope {
    fn from(id: EventId) -> Self {
        Scope::Event(id)
    }
}

impl From<RoomId> for Scope {
    fn from(id: RoomId) -> Self {
        Scope::Room(id)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Event(id) => write!(f, "event:{}", id),
            Scope::Room(id) => write!(f, "room:{}", id),
        }
    }
}
