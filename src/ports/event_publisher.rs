//! EventPublisher port - Interface for publishing live domain events.
//!
//! The domain publishes `EventEnvelope`s without knowing how they travel.
//! The in-process bus is the only adapter; there is no durable queue.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Delivery is best-effort and transient: nothing is stored for replay.
///
/// # Example
///
/// ```ignore
/// let envelope = EventEnvelope::new(LiveEvent::BreakoutEnded(ended));
/// publisher.publish(envelope).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish several events in order.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_publisher_is_object_safe() {
        fn _accepts_dyn(_publisher: &dyn EventPublisher) {}
    }
}
