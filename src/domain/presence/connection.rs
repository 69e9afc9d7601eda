//! A live transport connection as seen by the presence layer.

use crate::domain::foundation::{ConnectionId, EventId, UserId};

/// One live client connection attached to an event.
///
/// Scope memberships live in the connection registry; this value only
/// carries what the transport knows about the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    id: ConnectionId,
    event_id: EventId,
    identity: Option<UserId>,
}

impl Connection {
    /// A freshly accepted, not yet resolved connection.
    pub fn new(event_id: EventId) -> Self {
        Self::with_id(ConnectionId::new(), event_id)
    }

    pub fn with_id(id: ConnectionId, event_id: EventId) -> Self {
        Self {
            id,
            event_id,
            identity: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.identity.is_some()
    }

    /// Binds the connection to a verified identity.
    pub fn resolve(&mut self, user_id: UserId) {
        self.identity = Some(user_id);
    }
}
