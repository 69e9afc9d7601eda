//! Event infrastructure for domain event publishing and handling.
//!
//! - `LiveEvent` - Closed set of domain events the subsystem reacts to
//! - `LiveEventKind` - Fieldless discriminant used for subscription routing
//! - `EventEnvelope` - Transport wrapper carrying tracing metadata
//!
//! Subscription is by `LiveEventKind`, never by free-form event names, so an
//! unknown event type cannot be published or subscribed to.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::{CommandMetadata, ConnectionId, EventId, RoomId, Scope, Timestamp, UserId};

// ============================================
// Live events
// ============================================

/// Chat message activity produced by the message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEvent {
    /// Where the message lives: the whole event or one breakout room.
    pub scope: Scope,
    pub message_id: String,
    /// Opaque message document as stored.
    #[serde(default)]
    pub body: JsonValue,
}

/// One room created by a breakout start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAssignment {
    pub room_id: RoomId,
    pub index: u32,
}

/// Rooms for an event were created and connections moved into them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakoutStarted {
    pub event_id: EventId,
    pub rooms: Vec<RoomAssignment>,
}

/// All rooms of an event were deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakoutEnded {
    pub event_id: EventId,
    pub room_ids: Vec<RoomId>,
}

/// A moderator moved a user between rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomChanged {
    pub event_id: EventId,
    pub from_room: RoomId,
    pub to_room: RoomId,
    pub user_id: UserId,
    pub connections: Vec<ConnectionId>,
}

/// Every domain event the fan-out understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LiveEvent {
    #[serde(rename = "message.created")]
    MessageCreated(ChatMessageEvent),
    #[serde(rename = "message.updated")]
    MessageUpdated(ChatMessageEvent),
    #[serde(rename = "message.deleted")]
    MessageDeleted(ChatMessageEvent),
    #[serde(rename = "message.moderated")]
    MessageModerated(ChatMessageEvent),
    #[serde(rename = "breakout.started")]
    BreakoutStarted(BreakoutStarted),
    #[serde(rename = "breakout.ended")]
    BreakoutEnded(BreakoutEnded),
    #[serde(rename = "breakout.room_changed")]
    RoomChanged(RoomChanged),
}

impl LiveEvent {
    /// Discriminant used for routing.
    pub fn kind(&self) -> LiveEventKind {
        match self {
            LiveEvent::MessageCreated(_) => LiveEventKind::MessageCreated,
            LiveEvent::MessageUpdated(_) => LiveEventKind::MessageUpdated,
            LiveEvent::MessageDeleted(_) => LiveEventKind::MessageDeleted,
            LiveEvent::MessageModerated(_) => LiveEventKind::MessageModerated,
            LiveEvent::BreakoutStarted(_) => LiveEventKind::BreakoutStarted,
            LiveEvent::BreakoutEnded(_) => LiveEventKind::BreakoutEnded,
            LiveEvent::RoomChanged(_) => LiveEventKind::RoomChanged,
        }
    }

    /// The town-hall event this domain event belongs to, when it says so.
    ///
    /// Message events scoped to a room only carry the room id.
    pub fn event_id(&self) -> Option<&EventId> {
        match self {
            LiveEvent::MessageCreated(m)
            | LiveEvent::MessageUpdated(m)
            | LiveEvent::MessageDeleted(m)
            | LiveEvent::MessageModerated(m) => match &m.scope {
                Scope::Event(id) => Some(id),
                Scope::Room(_) => None,
            },
            LiveEvent::BreakoutStarted(e) => Some(&e.event_id),
            LiveEvent::BreakoutEnded(e) => Some(&e.event_id),
            LiveEvent::RoomChanged(e) => Some(&e.event_id),
        }
    }
}

/// Fieldless twin of [`LiveEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveEventKind {
    MessageCreated,
    MessageUpdated,
    MessageDeleted,
    MessageModerated,
    BreakoutStarted,
    BreakoutEnded,
    RoomChanged,
}

impl LiveEventKind {
    /// Every kind, in declaration order.
    pub const ALL: [LiveEventKind; 7] = [
        LiveEventKind::MessageCreated,
        LiveEventKind::MessageUpdated,
        LiveEventKind::MessageDeleted,
        LiveEventKind::MessageModerated,
        LiveEventKind::BreakoutStarted,
        LiveEventKind::BreakoutEnded,
        LiveEventKind::RoomChanged,
    ];

    /// Wire name, matching the serde tag of the corresponding `LiveEvent`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LiveEventKind::MessageCreated => "message.created",
            LiveEventKind::MessageUpdated => "message.updated",
            LiveEventKind::MessageDeleted => "message.deleted",
            LiveEventKind::MessageModerated => "message.moderated",
            LiveEventKind::BreakoutStarted => "breakout.started",
            LiveEventKind::BreakoutEnded => "breakout.ended",
            LiveEventKind::RoomChanged => "breakout.room_changed",
        }
    }

    /// True for the four chat message kinds.
    pub fn is_message(&self) -> bool {
        matches!(
            self,
            LiveEventKind::MessageCreated
                | LiveEventKind::MessageUpdated
                | LiveEventKind::MessageDeleted
                | LiveEventKind::MessageModerated
        )
    }
}

impl fmt::Display for LiveEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Envelope
// ============================================

/// Unique identifier for an envelope (used for deduplication and logs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvelopeId(String);

impl EnvelopeId {
    /// Creates a new random EnvelopeId using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EnvelopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata for tracing and correlation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// ID linking related events across a single user request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Where the triggering command came from (e.g., "websocket").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// User who initiated the action that led to this event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Transport envelope for live events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique ID for this envelope.
    pub envelope_id: EnvelopeId,

    /// When the event occurred.
    pub occurred_at: Timestamp,

    /// The event itself.
    pub event: LiveEvent,

    /// Tracing and correlation metadata.
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Wraps an event, stamping it with a fresh id and the current time.
    pub fn new(event: LiveEvent) -> Self {
        Self {
            envelope_id: EnvelopeId::new(),
            occurred_at: Timestamp::now(),
            event,
            metadata: EventMetadata::default(),
        }
    }

    /// Routing key of the wrapped event.
    pub fn kind(&self) -> LiveEventKind {
        self.event.kind()
    }

    /// Copies correlation ID and source from the triggering command.
    pub fn with_command_metadata(mut self, command: &CommandMetadata) -> Self {
        self.metadata.correlation_id = Some(command.correlation_id());
        self.metadata.source = command.source().map(str::to_string);
        self
    }

    /// Add user ID for audit.
    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(id.into());
        self
    }
}
