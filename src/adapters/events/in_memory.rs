//! In-process event bus.
//!
//! Constructed once at startup and injected wherever events are published
//! or consumed; there is no global instance. Handlers run in subscription
//! order on the publisher's task.
//!
//! A recording bus additionally keeps every published envelope so tests can
//! assert on what was emitted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope, LiveEventKind};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// In-memory event bus keyed by `LiveEventKind`.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::recording());
/// bus.subscribe(LiveEventKind::BreakoutStarted, fan_out);
///
/// bus.publish(envelope).await?;
/// assert!(bus.has_event(LiveEventKind::BreakoutStarted));
/// ```
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<LiveEventKind, Vec<Arc<dyn EventHandler>>>>,
    published: Option<RwLock<Vec<EventEnvelope>>>,
}

impl InMemoryEventBus {
    /// Bus that dispatches without keeping history.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: None,
        }
    }

    /// Bus that also records every published envelope.
    pub fn recording() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: Some(RwLock::new(Vec::new())),
        }
    }

    // === Test Helpers ===

    /// Returns all recorded events. Empty for a non-recording bus.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .as_ref()
            .map(|p| p.read().unwrap_or_else(PoisonError::into_inner).clone())
            .unwrap_or_default()
    }

    /// Returns recorded events of one kind.
    pub fn events_of_kind(&self, kind: LiveEventKind) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.kind() == kind)
            .collect()
    }

    /// Clears recorded events (for test isolation).
    pub fn clear(&self) {
        if let Some(published) = &self.published {
            published
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }

    pub fn event_count(&self) -> usize {
        self.published_events().len()
    }

    pub fn has_event(&self, kind: LiveEventKind) -> bool {
        self.published_events().iter().any(|e| e.kind() == kind)
    }

    /// Number of handlers subscribed to `kind`.
    pub fn handler_count(&self, kind: LiveEventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if let Some(published) = &self.published {
            published
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        }

        // Clone handlers to release lock before await points
        let kind_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers.get(&event.kind()).cloned().unwrap_or_default()
        };

        let mut errors = Vec::new();
        for handler in kind_handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    handler = handler.name(),
                    kind = %event.kind(),
                    envelope_id = %event.envelope_id,
                    error = %e,
                    "Event handler failed"
                );
                errors.push(format!("{}: {}", handler.name(), e));
            }
        }

        if !errors.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Handler errors: {}", errors.join(", ")),
            ));
        }

        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, kind: LiveEventKind, handler: Arc<dyn EventHandler>) {
        tracing::debug!(handler = handler.name(), kind = %kind, "Handler subscribed");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{BreakoutEnded, EventId, LiveEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ended(event: &str) -> EventEnvelope {
        EventEnvelope::new(LiveEvent::BreakoutEnded(BreakoutEnded {
            event_id: EventId::new(event).unwrap(),
            room_ids: vec![],
        }))
    }

    fn started(event: &str) -> EventEnvelope {
        EventEnvelope::new(LiveEvent::BreakoutStarted(
            crate::domain::foundation::BreakoutStarted {
                event_id: EventId::new(event).unwrap(),
                rooms: vec![],
            },
        ))
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    #[tokio::test]
    async fn recording_bus_stores_event() {
        let bus = InMemoryEventBus::recording();

        bus.publish(ended("e-1")).await.unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event(LiveEventKind::BreakoutEnded));
        assert!(!bus.has_event(LiveEventKind::BreakoutStarted));
    }

    #[tokio::test]
    async fn plain_bus_keeps_no_history() {
        let bus = InMemoryEventBus::new();
        bus.publish(ended("e-1")).await.unwrap();
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn events_of_kind_filters_correctly() {
        let bus = InMemoryEventBus::recording();

        bus.publish(ended("e-1")).await.unwrap();
        bus.publish(started("e-1")).await.unwrap();
        bus.publish(ended("e-2")).await.unwrap();

        assert_eq!(bus.events_of_kind(LiveEventKind::BreakoutEnded).len(), 2);
    }

    #[tokio::test]
    async fn handlers_only_see_their_kind() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe_all(
            &[LiveEventKind::BreakoutStarted, LiveEventKind::BreakoutEnded],
            Arc::new(CountingHandler(counter.clone())),
        );
        bus.subscribe(
            LiveEventKind::BreakoutEnded,
            Arc::new(CountingHandler(counter.clone())),
        );

        bus.publish(started("e")).await.unwrap();
        bus.publish(ended("e")).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(bus.handler_count(LiveEventKind::BreakoutEnded), 2);
        assert_eq!(bus.handler_count(LiveEventKind::RoomChanged), 0);
    }

    #[tokio::test]
    async fn clear_removes_all_events() {
        let bus = InMemoryEventBus::recording();
        bus.publish_all(vec![ended("a"), ended("b")]).await.unwrap();
        assert_eq!(bus.event_count(), 2);

        bus.clear();

        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn handler_error_is_propagated_after_all_handlers_run() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        struct FailingHandler;

        #[async_trait]
        impl EventHandler for FailingHandler {
            async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
                Err(DomainError::new(ErrorCode::InternalError, "Handler failed"))
            }
            fn name(&self) -> &'static str {
                "FailingHandler"
            }
        }

        bus.subscribe(LiveEventKind::BreakoutEnded, Arc::new(FailingHandler));
        bus.subscribe(
            LiveEventKind::BreakoutEnded,
            Arc::new(CountingHandler(counter.clone())),
        );
        let result = bus.publish(ended("e")).await;

        assert!(result.unwrap_err().message.contains("FailingHandler"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
