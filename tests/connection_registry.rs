//! Registry behaviour through the public adapter.

use std::sync::Arc;
use std::thread;

use townhall_presence::adapters::presence::InMemoryConnectionRegistry;
use townhall_presence::domain::foundation::{ConnectionId, EventId, RoomId, Scope};
use townhall_presence::ports::ConnectionRegistry;

fn event_scope() -> Scope {
    Scope::Event(EventId::new("townhall-42").unwrap())
}

#[test]
fn join_and_leave_are_idempotent() {
    let registry = InMemoryConnectionRegistry::new();
    let conn = ConnectionId::new();

    registry.join(conn, event_scope());
    registry.join(conn, event_scope());
    assert_eq!(registry.members(&event_scope()), vec![conn]);

    registry.leave(conn, &event_scope());
    registry.leave(conn, &event_scope());
    assert!(registry.members(&event_scope()).is_empty());
    assert!(registry.active_scopes().is_empty());
}

#[test]
fn connection_is_in_at_most_one_room() {
    let registry = InMemoryConnectionRegistry::new();
    let conn = ConnectionId::new();
    let (a, b) = (RoomId::new(), RoomId::new());
    registry.join(conn, event_scope());

    assert_eq!(registry.assign_room(conn, a), None);
    assert_eq!(registry.assign_room(conn, b), Some(a));

    assert!(registry.members(&Scope::Room(a)).is_empty());
    assert_eq!(registry.room_of(conn), Some(b));
    assert_eq!(registry.scopes_of(conn).len(), 2);
}

#[test]
fn remove_connection_leaves_every_scope() {
    let registry = InMemoryConnectionRegistry::new();
    let conn = ConnectionId::new();
    let room = RoomId::new();
    registry.join(conn, event_scope());
    registry.assign_room(conn, room);

    let left = registry.remove_connection(conn);

    assert_eq!(left.len(), 2);
    assert!(registry.scopes_of(conn).is_empty());
    assert!(registry.members(&Scope::Room(room)).is_empty());
    assert!(registry.remove_connection(conn).is_empty());
}

#[test]
fn concurrent_joins_are_all_recorded() {
    let registry = Arc::new(InMemoryConnectionRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..50 {
                    registry.join(ConnectionId::new(), event_scope());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.members(&event_scope()).len(), 400);
    assert_eq!(registry.connection_count(), 400);
}
