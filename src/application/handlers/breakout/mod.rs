//! Room lifecycle handlers.
//!
//! Every mutating operation holds the event's lock from [`EventLocks`] for
//! its whole duration. Domain events are published after the state change
//! is durable; a failed publish is logged and does not fail the operation.

mod change_room;
mod end_breakout;
mod event_locks;
mod find_my_room;
mod lifecycle_manager;
mod start_breakout;

#[cfg(test)]
pub(crate) mod test_support;

pub use change_room::{ChangeRoomCommand, ChangeRoomHandler, ChangeRoomOutcome};
pub use end_breakout::{EndBreakoutCommand, EndBreakoutHandler, EndBreakoutResult};
pub use event_locks::EventLocks;
pub use find_my_room::{FindMyRoomHandler, FindMyRoomQuery};
pub use lifecycle_manager::{LifecycleDeps, RoomLifecycleManager};
pub use start_breakout::{
    StartBreakoutCommand, StartBreakoutHandler, StartBreakoutResult, StartedRoom,
};

use crate::domain::foundation::EventEnvelope;
use crate::ports::EventPublisher;

async fn publish_best_effort(publisher: &dyn EventPublisher, envelope: EventEnvelope) {
    let kind = envelope.kind();
    let envelope_id = envelope.envelope_id.clone();
    if let Err(e) = publisher.publish(envelope).await {
        tracing::warn!(
            event_kind = %kind,
            envelope_id = %envelope_id,
            error = %e,
            "Lifecycle event publish failed"
        );
    }
}
