//! In-memory connection registry.
//!
//! Scopes are organized by event and by room, allowing targeted fan-out to
//! every connection of an event or of a single breakout room.
//!
//! # Architecture
//!
//! ```text
//! Scope: event:townhall-1      Scope: room:7f3c…       Scope: room:91ab…
//! ├── conn-a                   ├── conn-a              ├── conn-c
//! ├── conn-b                   └── conn-b              └── conn-d
//! ├── conn-c
//! └── conn-d
//! ```
//!
//! A reverse index (connection → scopes) makes disconnect cleanup and the
//! at-most-one-room rule O(scopes of that connection).

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::foundation::{ConnectionId, RoomId, Scope};
use crate::ports::ConnectionRegistry;

#[derive(Default)]
struct RegistryState {
    /// scope → members. Empty scopes are removed.
    scopes: HashMap<Scope, BTreeSet<ConnectionId>>,
    /// connection → scopes it is in. Connections in no scope are removed.
    connections: HashMap<ConnectionId, BTreeSet<Scope>>,
}

impl RegistryState {
    fn join(&mut self, connection: ConnectionId, scope: Scope) {
        self.scopes
            .entry(scope.clone())
            .or_default()
            .insert(connection);
        self.connections.entry(connection).or_default().insert(scope);
    }

    fn leave(&mut self, connection: ConnectionId, scope: &Scope) {
        if let Some(members) = self.scopes.get_mut(scope) {
            members.remove(&connection);
            if members.is_empty() {
                self.scopes.remove(scope);
            }
        }
        if let Some(scopes) = self.connections.get_mut(&connection) {
            scopes.remove(scope);
            if scopes.is_empty() {
                self.connections.remove(&connection);
            }
        }
    }

    fn contains(&self, connection: ConnectionId, scope: &Scope) -> bool {
        self.connections
            .get(&connection)
            .map_or(false, |scopes| scopes.contains(scope))
    }

    fn assign_room(&mut self, connection: ConnectionId, room: RoomId) -> Option<RoomId> {
        let previous = self
            .scopes_of(connection)
            .into_iter()
            .filter_map(|scope| scope.room_id())
            .filter(|id| *id != room)
            .collect::<Vec<_>>();
        for old in &previous {
            self.leave(connection, &Scope::Room(*old));
        }
        self.join(connection, Scope::Room(room));
        previous.into_iter().next()
    }

    fn scopes_of(&self, connection: ConnectionId) -> Vec<Scope> {
        self.connections
            .get(&connection)
            .map(|scopes| scopes.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Process-local `ConnectionRegistry`.
///
/// # Thread Safety
///
/// All state sits behind one `std::sync::Mutex`. Every trait method takes
/// the lock once, so multi-scope operations (`assign_room`,
/// `remove_connection`) are atomic with respect to each other. The lock is
/// never held across an `.await`. A poisoned lock is recovered: every
/// mutation leaves both maps consistent before it can panic.
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of distinct connections in any scope.
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Every non-empty scope (for monitoring).
    pub fn active_scopes(&self) -> Vec<Scope> {
        self.lock().scopes.keys().cloned().collect()
    }
}

impl ConnectionRegistry for InMemoryConnectionRegistry {
    fn join(&self, connection: ConnectionId, scope: Scope) {
        self.lock().join(connection, scope);
    }

    fn leave(&self, connection: ConnectionId, scope: &Scope) {
        self.lock().leave(connection, scope);
    }

    fn members(&self, scope: &Scope) -> Vec<ConnectionId> {
        self.lock()
            .scopes
            .get(scope)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    fn remove_connection(&self, connection: ConnectionId) -> Vec<Scope> {
        let mut state = self.lock();
        let scopes = state.scopes_of(connection);
        for scope in &scopes {
            state.leave(connection, scope);
        }
        scopes
    }

    fn assign_room(&self, connection: ConnectionId, room: RoomId) -> Option<RoomId> {
        self.lock().assign_room(connection, room)
    }

    fn assign_room_if_in(&self, connection: ConnectionId, required: &Scope, room: RoomId) -> bool {
        let mut state = self.lock();
        if !state.contains(connection, required) {
            return false;
        }
        state.assign_room(connection, room);
        true
    }

    fn clear_scope(&self, scope: &Scope) -> Vec<ConnectionId> {
        let mut state = self.lock();
        let members: Vec<ConnectionId> = state
            .scopes
            .get(scope)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        for connection in &members {
            state.leave(*connection, scope);
        }
        members
    }

    fn scopes_of(&self, connection: ConnectionId) -> Vec<Scope> {
        self.lock().scopes_of(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::EventId;
    use std::sync::Arc;

    fn event_scope(id: &str) -> Scope {
        Scope::Event(EventId::new(id).unwrap())
    }

    #[test]
    fn join_twice_keeps_single_membership() {
        let registry = InMemoryConnectionRegistry::new();
        let conn = ConnectionId::new();
        let scope = event_scope("e-1");

        registry.join(conn, scope.clone());
        registry.join(conn, scope.clone());

        assert_eq!(registry.members(&scope), vec![conn]);
    }

    #[test]
    fn leave_non_member_is_noop() {
        let registry = InMemoryConnectionRegistry::new();
        let member = ConnectionId::new();
        let scope = event_scope("e-1");
        registry.join(member, scope.clone());

        registry.leave(ConnectionId::new(), &scope);
        registry.leave(member, &event_scope("other"));

        assert_eq!(registry.members(&scope), vec![member]);
    }

    #[test]
    fn members_of_unknown_scope_is_empty() {
        let registry = InMemoryConnectionRegistry::new();
        assert!(registry.members(&Scope::Room(RoomId::new())).is_empty());
    }

    #[test]
    fn members_is_a_snapshot() {
        let registry = InMemoryConnectionRegistry::new();
        let scope = event_scope("e-1");
        let conn = ConnectionId::new();
        registry.join(conn, scope.clone());

        let snapshot = registry.members(&scope);
        registry.leave(conn, &scope);

        assert_eq!(snapshot, vec![conn]);
        assert!(registry.members(&scope).is_empty());
    }

    #[test]
    fn remove_connection_leaves_every_scope() {
        let registry = InMemoryConnectionRegistry::new();
        let conn = ConnectionId::new();
        let other = ConnectionId::new();
        let event = event_scope("e-1");
        let room = RoomId::new();

        registry.join(conn, event.clone());
        registry.join(other, event.clone());
        registry.assign_room(conn, room);

        let left = registry.remove_connection(conn);

        assert_eq!(left.len(), 2);
        assert_eq!(registry.members(&event), vec![other]);
        assert!(registry.members(&Scope::Room(room)).is_empty());
        assert!(registry.scopes_of(conn).is_empty());
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn assign_room_keeps_at_most_one_room() {
        let registry = InMemoryConnectionRegistry::new();
        let conn = ConnectionId::new();
        let event = event_scope("e-1");
        let (a, b) = (RoomId::new(), RoomId::new());

        registry.join(conn, event.clone());
        assert_eq!(registry.assign_room(conn, a), None);
        assert_eq!(registry.assign_room(conn, b), Some(a));

        assert!(registry.members(&Scope::Room(a)).is_empty());
        assert_eq!(registry.members(&Scope::Room(b)), vec![conn]);
        assert_eq!(registry.room_of(conn), Some(b));
        assert_eq!(registry.members(&event), vec![conn]);
    }

    #[test]
    fn assign_same_room_again_is_noop() {
        let registry = InMemoryConnectionRegistry::new();
        let conn = ConnectionId::new();
        let room = RoomId::new();

        registry.assign_room(conn, room);
        assert_eq!(registry.assign_room(conn, room), None);
        assert_eq!(registry.members(&Scope::Room(room)), vec![conn]);
    }

    #[test]
    fn conditional_assign_refuses_removed_connection() {
        let registry = InMemoryConnectionRegistry::new();
        let event = event_scope("e-1");
        let (gone, here) = (ConnectionId::new(), ConnectionId::new());
        let room = RoomId::new();
        registry.join(gone, event.clone());
        registry.join(here, event.clone());
        registry.remove_connection(gone);

        assert!(!registry.assign_room_if_in(gone, &event, room));
        assert!(registry.assign_room_if_in(here, &event, room));

        assert!(registry.scopes_of(gone).is_empty());
        assert_eq!(registry.members(&Scope::Room(room)), vec![here]);
    }

    #[test]
    fn conditional_assign_still_evicts_previous_room() {
        let registry = InMemoryConnectionRegistry::new();
        let event = event_scope("e-1");
        let conn = ConnectionId::new();
        let (a, b) = (RoomId::new(), RoomId::new());
        registry.join(conn, event.clone());
        registry.assign_room(conn, a);

        assert!(registry.assign_room_if_in(conn, &event, b));

        assert_eq!(registry.room_of(conn), Some(b));
        assert!(registry.members(&Scope::Room(a)).is_empty());
    }

    #[test]
    fn clear_scope_returns_former_members() {
        let registry = InMemoryConnectionRegistry::new();
        let room = RoomId::new();
        let event = event_scope("e-1");
        let conns: Vec<_> = (0..3).map(|_| ConnectionId::new()).collect();
        for conn in &conns {
            registry.join(*conn, event.clone());
            registry.assign_room(*conn, room);
        }

        let mut cleared = registry.clear_scope(&Scope::Room(room));
        cleared.sort();
        let mut expected = conns.clone();
        expected.sort();

        assert_eq!(cleared, expected);
        assert!(registry.members(&Scope::Room(room)).is_empty());
        assert_eq!(registry.members(&event).len(), 3);
        assert!(!registry.active_scopes().contains(&Scope::Room(room)));
    }

    #[test]
    fn concurrent_joins_and_leaves_lose_nothing() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let scope = event_scope("e-1");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let scope = scope.clone();
                std::thread::spawn(move || {
                    let mut kept = Vec::new();
                    for i in 0..200 {
                        let conn = ConnectionId::new();
                        registry.join(conn, scope.clone());
                        if i % 2 == 0 {
                            registry.leave(conn, &scope);
                        } else {
                            kept.push(conn);
                        }
                    }
                    kept
                })
            })
            .collect();

        let mut expected: Vec<ConnectionId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        expected.sort();

        assert_eq!(registry.members(&scope), expected);
    }
}
