//! Per-event serialization of lifecycle operations.
//!
//! Start, end, change-room, and the rejoin step of connect each hold the
//! event's lock for their whole duration, so a partition is never computed
//! from a membership snapshot that a concurrent start or end invalidates.
//! Different events never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::EventId;

#[derive(Default)]
pub struct EventLocks {
    locks: Mutex<HashMap<EventId, Arc<AsyncMutex<()>>>>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the event.
    pub async fn lock(&self, event_id: &EventId) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Idle entries are only referenced by the map.
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(locks.entry(event_id.clone()).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of events with a held or awaited lock.
    pub fn tracked_events(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|m| Arc::strong_count(m) > 1)
            .count()
    }
}
