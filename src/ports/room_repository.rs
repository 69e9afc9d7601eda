//! Room repository port.
//!
//! Rooms are never deleted. Ending a breakout flips `active` to false and
//! leaves the records for history.

use async_trait::async_trait;

use crate::domain::breakout::Room;
use crate::domain::foundation::{DomainError, EventId, RoomId, UserId};

/// Repository port for Room persistence.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Persist a new room.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, room: &Room) -> Result<RoomId, DomainError>;

    /// Deactivate every active room of the event in one bulk update.
    ///
    /// Returns the number of rooms changed.
    async fn deactivate_by_event(&self, event_id: &EventId) -> Result<u64, DomainError>;

    /// Deactivate a single room. Used to roll back a failed start.
    async fn deactivate(&self, room_id: &RoomId) -> Result<(), DomainError>;

    /// Overwrite a room's member set.
    ///
    /// # Errors
    ///
    /// - `RoomNotFound` if the room doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_members(&self, room: &Room) -> Result<(), DomainError>;

    /// Find a room by id, active or not.
    async fn find_by_id(&self, room_id: &RoomId) -> Result<Option<Room>, DomainError>;

    /// Active rooms of the event, ordered by index.
    async fn find_active_by_event(&self, event_id: &EventId) -> Result<Vec<Room>, DomainError>;

    /// Active rooms of the event whose member set contains the user,
    /// newest first.
    async fn find_containing_member(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Vec<Room>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn RoomRepository) {}
    }
}
