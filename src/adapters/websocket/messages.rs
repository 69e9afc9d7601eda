//! Client → server messages of the live protocol.
//!
//! Server → client messages are [`ServerMessage`](crate::domain::presence::ServerMessage),
//! shared with the fan-out.

use serde::Deserialize;

use crate::domain::foundation::{EventId, RoomId, UserId};
use crate::application::ChangeRoomCommand;

/// All message types that can be received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Heartbeat request.
    #[serde(rename = "ping")]
    Ping,

    /// Ask which breakout room this user belongs to.
    #[serde(rename = "room.request")]
    RoomRequest,

    /// Moderator: split the event into rooms.
    #[serde(rename = "breakout.start", rename_all = "camelCase")]
    BreakoutStart { room_count: usize },

    /// Moderator: end the running breakout.
    #[serde(rename = "breakout.end")]
    BreakoutEnd,

    /// Moderator: move a user between rooms.
    #[serde(rename = "breakout.change_room", rename_all = "camelCase")]
    BreakoutChangeRoom {
        from_room: RoomId,
        to_room: RoomId,
        user_id: UserId,
    },
}

impl ClientMessage {
    /// True for messages only moderators may send.
    pub fn requires_moderator(&self) -> bool {
        matches!(
            self,
            ClientMessage::BreakoutStart { .. }
                | ClientMessage::BreakoutEnd
                | ClientMessage::BreakoutChangeRoom { .. }
        )
    }

    /// Builds the change-room command for `event_id`, if this is one.
    pub fn change_room_command(&self, event_id: &EventId) -> Option<ChangeRoomCommand> {
        match self {
            ClientMessage::BreakoutChangeRoom {
                from_room,
                to_room,
                user_id,
            } => Some(ChangeRoomCommand {
                event_id: event_id.clone(),
                from_room: *from_room,
                to_room: *to_room,
                user_id: user_id.clone(),
            }),
            _ => None,
        }
    }
}
