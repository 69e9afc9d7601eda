//! FindMyRoomHandler - Looks up a user's current breakout room.

use std::sync::Arc;

use crate::domain::breakout::{BreakoutError, Room};
use crate::domain::foundation::{EventId, UserId};
use crate::ports::RoomRepository;

#[derive(Debug, Clone)]
pub struct FindMyRoomQuery {
    pub event_id: EventId,
    pub user_id: UserId,
}

pub struct FindMyRoomHandler {
    rooms: Arc<dyn RoomRepository>,
}

impl FindMyRoomHandler {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    /// Returns the newest active room of the event listing the user.
    ///
    /// Membership is by identity, so this finds the room again after a
    /// reconnect with a new connection id.
    pub async fn handle(&self, query: FindMyRoomQuery) -> Result<Option<Room>, BreakoutError> {
        let rooms = self
            .rooms
            .find_containing_member(&query.event_id, &query.user_id)
            .await?;
        if rooms.len() > 1 {
            tracing::warn!(
                event_id = %query.event_id,
                user_id = %query.user_id,
                rooms = rooms.len(),
                "User listed in several active rooms, using newest"
            );
        }
        Ok(rooms.into_iter().next())
    }
}
