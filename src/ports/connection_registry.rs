//! ConnectionRegistry port - which live connections belong to which scope.
//!
//! The registry is the single piece of shared mutable state in the presence
//! subsystem. Every operation is synchronous and infallible: implementations
//! keep state in memory and apply each call as one critical section, so a
//! `members` snapshot never observes a half-applied mutation.
//!
//! ## Scope rules
//!
//! - A connection may sit in its `Scope::Event` and at most one
//!   `Scope::Room` at the same time.
//! - `assign_room` is the only way to enter a room scope that keeps that
//!   rule; plain `join` with a room scope is allowed but does not evict.
//! - Lifecycle operations move connections with `assign_room_if_in`, so a
//!   connection removed by a concurrent disconnect is never put back.
//!
//! There is no cross-process sharing; each server owns its own registry.

use crate::domain::foundation::{ConnectionId, RoomId, Scope};

/// Port for in-process scope membership bookkeeping.
///
/// Methods must not suspend. Callers hold no lock across `.await`.
pub trait ConnectionRegistry: Send + Sync {
    /// Adds `connection` to `scope`. Joining twice is a no-op.
    fn join(&self, connection: ConnectionId, scope: Scope);

    /// Removes `connection` from `scope`. Leaving a scope the connection is
    /// not in is a no-op.
    fn leave(&self, connection: ConnectionId, scope: &Scope);

    /// Snapshot of the scope's members, in ascending id order.
    fn members(&self, scope: &Scope) -> Vec<ConnectionId>;

    /// Removes the connection from every scope. Returns the scopes it left.
    fn remove_connection(&self, connection: ConnectionId) -> Vec<Scope>;

    /// Moves the connection into `room`, leaving any other room scope in the
    /// same critical section. Returns the room it left, if any.
    fn assign_room(&self, connection: ConnectionId, room: RoomId) -> Option<RoomId>;

    /// Like [`assign_room`](Self::assign_room), but only while the
    /// connection is still in `required`, checked in the same critical
    /// section. Returns false, changing nothing, once it has left.
    fn assign_room_if_in(&self, connection: ConnectionId, required: &Scope, room: RoomId) -> bool;

    /// Empties a scope. Returns the connections that were in it.
    fn clear_scope(&self, scope: &Scope) -> Vec<ConnectionId>;

    /// Every scope the connection is currently in.
    fn scopes_of(&self, connection: ConnectionId) -> Vec<Scope>;

    /// The room scope the connection is in, if any.
    fn room_of(&self, connection: ConnectionId) -> Option<RoomId> {
        self.scopes_of(connection)
            .into_iter()
            .find_map(|scope| scope.room_id())
    }
}
