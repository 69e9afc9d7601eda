//! In-memory RoomRepository for development and tests.
//!
//! Supports failure injection so rollback paths can be exercised: inserts
//! and member updates can be told to fail after a number of successes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

use crate::domain::breakout::Room;
use crate::domain::foundation::{DomainError, ErrorCode, EventId, RoomId, UserId};
use crate::ports::RoomRepository;

const UNLIMITED: usize = usize::MAX;

/// In-memory room storage.
#[derive(Debug, Clone)]
pub struct InMemoryRoomRepository {
    rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    inserts_left: Arc<AtomicUsize>,
    updates_left: Arc<AtomicUsize>,
    fail_bulk_deactivate: Arc<AtomicBool>,
    fail_deactivate: Arc<AtomicBool>,
    failing_room: Arc<Mutex<Option<RoomId>>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            inserts_left: Arc::new(AtomicUsize::new(UNLIMITED)),
            updates_left: Arc::new(AtomicUsize::new(UNLIMITED)),
            fail_bulk_deactivate: Arc::new(AtomicBool::new(false)),
            fail_deactivate: Arc::new(AtomicBool::new(false)),
            failing_room: Arc::new(Mutex::new(None)),
        }
    }

    /// Let `successes` inserts through, then fail every later one.
    pub fn fail_inserts_after(&self, successes: usize) {
        self.inserts_left.store(successes, Ordering::SeqCst);
    }

    /// Let `successes` member updates through, then fail every later one.
    pub fn fail_updates_after(&self, successes: usize) {
        self.updates_left.store(successes, Ordering::SeqCst);
    }

    pub fn fail_bulk_deactivate(&self, fail: bool) {
        self.fail_bulk_deactivate.store(fail, Ordering::SeqCst);
    }

    /// Fail single-room deactivation (bulk deactivation is unaffected).
    pub fn fail_deactivate(&self, fail: bool) {
        self.fail_deactivate.store(fail, Ordering::SeqCst);
    }

    /// Fail every member update of one room.
    pub fn fail_updates_for(&self, room_id: RoomId) {
        *self.failing_room.lock().unwrap_or_else(PoisonError::into_inner) = Some(room_id);
    }

    /// Clears injected failures.
    pub fn heal(&self) {
        self.inserts_left.store(UNLIMITED, Ordering::SeqCst);
        self.updates_left.store(UNLIMITED, Ordering::SeqCst);
        self.fail_bulk_deactivate.store(false, Ordering::SeqCst);
        self.fail_deactivate.store(false, Ordering::SeqCst);
        *self.failing_room.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn update_blocked(&self, room_id: &RoomId) -> bool {
        let failing = *self.failing_room.lock().unwrap_or_else(PoisonError::into_inner);
        failing.as_ref() == Some(room_id) || !take(&self.updates_left)
    }

    /// Every room of the event, active or not, ordered by creation.
    pub async fn all_for_event(&self, event_id: &EventId) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|r| r.event_id() == event_id)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| {
            a.created_at()
                .as_datetime()
                .cmp(b.created_at().as_datetime())
                .then(a.index().cmp(&b.index()))
        });
        rooms
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumes one unit of budget. Returns false once the budget is spent.
fn take(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
            UNLIMITED => Some(UNLIMITED),
            0 => None,
            n => Some(n - 1),
        })
        .is_ok()
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn insert(&self, room: &Room) -> Result<RoomId, DomainError> {
        if !take(&self.inserts_left) {
            return Err(DomainError::database("Simulated insert failure")
                .with_detail("room_id", room.id().to_string()));
        }
        self.rooms.write().await.insert(*room.id(), room.clone());
        Ok(*room.id())
    }

    async fn deactivate_by_event(&self, event_id: &EventId) -> Result<u64, DomainError> {
        if self.fail_bulk_deactivate.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated bulk deactivate failure"));
        }
        let mut rooms = self.rooms.write().await;
        let mut changed = 0;
        for room in rooms
            .values_mut()
            .filter(|r| r.event_id() == event_id && r.is_active())
        {
            room.deactivate();
            changed += 1;
        }
        Ok(changed)
    }

    async fn deactivate(&self, room_id: &RoomId) -> Result<(), DomainError> {
        if self.fail_deactivate.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated deactivate failure"));
        }
        if let Some(room) = self.rooms.write().await.get_mut(room_id) {
            room.deactivate();
        }
        Ok(())
    }

    async fn update_members(&self, room: &Room) -> Result<(), DomainError> {
        if self.update_blocked(room.id()) {
            return Err(DomainError::database("Simulated update failure"));
        }
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(room.id()) {
            Some(stored) => {
                *stored = Room::reconstitute(
                    *stored.id(),
                    stored.event_id().clone(),
                    stored.index(),
                    room.members().clone(),
                    stored.is_active(),
                    *stored.created_at(),
                );
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::RoomNotFound,
                format!("Room not found: {}", room.id()),
            )),
        }
    }

    async fn find_by_id(&self, room_id: &RoomId) -> Result<Option<Room>, DomainError> {
        Ok(self.rooms.read().await.get(room_id).cloned())
    }

    async fn find_active_by_event(&self, event_id: &EventId) -> Result<Vec<Room>, DomainError> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|r| r.event_id() == event_id && r.is_active())
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.index());
        Ok(rooms)
    }

    async fn find_containing_member(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Vec<Room>, DomainError> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|r| r.event_id() == event_id && r.is_active() && r.contains(user_id))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.created_at().as_datetime().cmp(a.created_at().as_datetime()));
        Ok(rooms)
    }
}
