//! Server → client notices.
//!
//! These are the payloads a connection can be sent: connection status, chat
//! fan-out, room assignment changes, errors, and heartbeats. Framing is the
//! transport's concern; this is only the JSON shape.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::domain::foundation::{
    ChatMessageEvent, ConnectionId, EventId, LiveEventKind, RoomId, Scope, Timestamp, UserId,
};

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection authenticated and joined its event.
    Connected(ConnectedMessage),

    /// Chat message activity in one of the connection's scopes.
    Message(ChatMessageNotice),

    #[serde(rename = "room.assigned")]
    RoomAssigned(RoomAssignedMessage),

    #[serde(rename = "room.cleared")]
    RoomCleared(RoomClearedMessage),

    #[serde(rename = "room.changed")]
    RoomChanged(RoomChangedMessage),

    /// Answer to a room request when the user has no active room.
    #[serde(rename = "room.none")]
    RoomNone(RoomNoneMessage),

    Error(ErrorMessage),

    Pong(PongMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub connection_id: ConnectionId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageNotice {
    /// One of `message.created`, `message.updated`, `message.deleted`,
    /// `message.moderated`.
    pub action: &'static str,
    pub scope: Scope,
    pub message_id: String,
    pub body: JsonValue,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAssignedMessage {
    pub event_id: EventId,
    pub room_id: RoomId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClearedMessage {
    pub event_id: EventId,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomChangedMessage {
    pub event_id: EventId,
    pub from_room: RoomId,
    pub to_room: RoomId,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomNoneMessage {
    pub event_id: EventId,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

fn now() -> String {
    Timestamp::now().to_rfc3339()
}

impl ServerMessage {
    pub fn connected(connection_id: ConnectionId, event_id: EventId, user_id: UserId) -> Self {
        ServerMessage::Connected(ConnectedMessage {
            connection_id,
            event_id,
            user_id,
            timestamp: now(),
        })
    }

    /// Chat notice for `kind`, which must be one of the message kinds.
    pub fn chat(kind: LiveEventKind, message: &ChatMessageEvent, occurred_at: &Timestamp) -> Self {
        ServerMessage::Message(ChatMessageNotice {
            action: kind.as_str(),
            scope: message.scope.clone(),
            message_id: message.message_id.clone(),
            body: message.body.clone(),
            timestamp: occurred_at.to_rfc3339(),
        })
    }

    pub fn room_assigned(event_id: EventId, room_id: RoomId, index: Option<u32>) -> Self {
        ServerMessage::RoomAssigned(RoomAssignedMessage {
            event_id,
            room_id,
            index,
            timestamp: now(),
        })
    }

    pub fn room_cleared(event_id: EventId) -> Self {
        ServerMessage::RoomCleared(RoomClearedMessage {
            event_id,
            timestamp: now(),
        })
    }

    pub fn room_changed(event_id: EventId, from_room: RoomId, to_room: RoomId) -> Self {
        ServerMessage::RoomChanged(RoomChangedMessage {
            event_id,
            from_room,
            to_room,
            timestamp: now(),
        })
    }

    pub fn room_none(event_id: EventId) -> Self {
        ServerMessage::RoomNone(RoomNoneMessage {
            event_id,
            timestamp: now(),
        })
    }

    pub fn error(code: impl ToString, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.to_string(),
            message: message.into(),
            timestamp: now(),
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage { timestamp: now() })
    }

    /// Wire name of the message, as serialized in `type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::Connected(_) => "connected",
            ServerMessage::Message(_) => "message",
            ServerMessage::RoomAssigned(_) => "room.assigned",
            ServerMessage::RoomCleared(_) => "room.cleared",
            ServerMessage::RoomChanged(_) => "room.changed",
            ServerMessage::RoomNone(_) => "room.none",
            ServerMessage::Error(_) => "error",
            ServerMessage::Pong(_) => "pong",
        }
    }
}
