//! Event fan-out connecting live domain events to connected sockets.
//!
//! # Event Flow
//!
//! ```text
//! LiveEvent published on the bus
//!          │
//!          ▼
//! ┌────────────────────┐
//! │  EventFanOut       │
//! │  picks target scope│
//! └────────────────────┘
//!          │
//!          ▼
//! ┌────────────────────┐
//! │ registry.members() │  ← read at delivery time, never cached
//! └────────────────────┘
//!          │
//!          ▼
//! ┌────────────────────┐
//! │ sink.send() to each│  ← one failure never blocks the rest
//! └────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{
    ConnectionId, DomainError, EventEnvelope, LiveEvent, LiveEventKind, Scope,
};
use crate::domain::presence::ServerMessage;
use crate::ports::{ConnectionRegistry, ConnectionSink, EventHandler, EventSubscriber};

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Delivers live events to exactly the connections in the event's scope.
pub struct EventFanOut {
    registry: Arc<dyn ConnectionRegistry>,
    sink: Arc<dyn ConnectionSink>,
}

impl EventFanOut {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, sink: Arc<dyn ConnectionSink>) -> Self {
        Self { registry, sink }
    }

    pub fn new_shared(
        registry: Arc<dyn ConnectionRegistry>,
        sink: Arc<dyn ConnectionSink>,
    ) -> Arc<Self> {
        Arc::new(Self::new(registry, sink))
    }

    /// Subscribes to every live event kind.
    pub fn register(self: &Arc<Self>, subscriber: &dyn EventSubscriber) {
        subscriber.subscribe_all(&LiveEventKind::ALL, self.clone());
    }

    /// Routes one envelope. Never fails; per-connection errors are counted.
    pub fn dispatch(&self, envelope: &EventEnvelope) -> FanOutReport {
        let kind = envelope.kind();
        match &envelope.event {
            LiveEvent::MessageCreated(message)
            | LiveEvent::MessageUpdated(message)
            | LiveEvent::MessageDeleted(message)
            | LiveEvent::MessageModerated(message) => {
                let notice = ServerMessage::chat(kind, message, &envelope.occurred_at);
                self.deliver_to_scope(&message.scope, &notice)
            }
            LiveEvent::BreakoutStarted(started) => {
                let mut report = FanOutReport::default();
                for room in &started.rooms {
                    let notice = ServerMessage::room_assigned(
                        started.event_id.clone(),
                        room.room_id,
                        Some(room.index),
                    );
                    report += self.deliver_to_scope(&Scope::Room(room.room_id), &notice);
                }
                report
            }
            LiveEvent::BreakoutEnded(ended) => {
                let notice = ServerMessage::room_cleared(ended.event_id.clone());
                self.deliver_to_scope(&Scope::Event(ended.event_id.clone()), &notice)
            }
            LiveEvent::RoomChanged(changed) => {
                let notice = ServerMessage::room_changed(
                    changed.event_id.clone(),
                    changed.from_room,
                    changed.to_room,
                );
                self.deliver(&changed.connections, &notice)
            }
        }
    }

    fn deliver_to_scope(&self, scope: &Scope, message: &ServerMessage) -> FanOutReport {
        let members = self.registry.members(scope);
        self.deliver(&members, message)
    }

    fn deliver(&self, targets: &[ConnectionId], message: &ServerMessage) -> FanOutReport {
        let mut report = FanOutReport::default();
        for connection in targets {
            match self.sink.send(connection, message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection,
                        message_type = message.type_name(),
                        error = %e,
                        "Dropped delivery"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl std::ops::AddAssign for FanOutReport {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

#[async_trait]
impl EventHandler for EventFanOut {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let report = self.dispatch(&event);
        tracing::debug!(
            kind = %event.kind(),
            envelope_id = %event.envelope_id,
            delivered = report.delivered,
            failed = report.failed,
            "Fanned out live event"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EventFanOut"
    }
}
