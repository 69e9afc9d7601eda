//! EventSubscriber port - Interface for subscribing to live domain events.
//!
//! Handlers register by `LiveEventKind`. There is no string-keyed
//! subscription, so a handler cannot subscribe to an event that does not
//! exist.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope, LiveEventKind};

/// Handler for processing domain events.
///
/// Implementations should be:
/// - **Quick** - the bus awaits each handler in turn
/// - **Isolated** - an error is logged by the bus and does not reach other handlers
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to domain events.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to one event kind.
    fn subscribe(&self, kind: LiveEventKind, handler: Arc<dyn EventHandler>);

    /// Subscribe the same handler to several kinds.
    fn subscribe_all(&self, kinds: &[LiveEventKind], handler: Arc<dyn EventHandler>) {
        for kind in kinds {
            self.subscribe(*kind, Arc::clone(&handler));
        }
    }
}

/// Combined trait for event bus implementations.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_handler_object_safe(_: &dyn EventHandler) {}

    #[allow(dead_code)]
    fn assert_subscriber_object_safe(_: &dyn EventSubscriber) {}
}
