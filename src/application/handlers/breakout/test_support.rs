//! Shared wiring for lifecycle handler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::adapters::auth::MockIdentityVerifier;
use crate::adapters::events::InMemoryEventBus;
use crate::adapters::presence::InMemoryConnectionRegistry;
use crate::adapters::storage::{InMemoryIdentityRepository, InMemoryRoomRepository};
use crate::application::handlers::presence::IdentityResolver;
use crate::domain::breakout::{Room, RoomPartitioner};
use crate::domain::foundation::{
    AuthenticatedUser, ConnectionId, DomainError, EventId, ModeratorGrant, RoomId, Scope, UserId,
};
use crate::ports::{ConnectionCredentials, ConnectionRegistry, RoomRepository};

use super::{EventLocks, LifecycleDeps};

pub(crate) struct Fixture {
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub rooms: InMemoryRoomRepository,
    pub identities: InMemoryIdentityRepository,
    pub verifier: Arc<MockIdentityVerifier>,
    pub resolver: Arc<IdentityResolver>,
    pub bus: Arc<InMemoryEventBus>,
    pub locks: Arc<EventLocks>,
    pub partitioner: Arc<RoomPartitioner>,
}

impl Fixture {
    pub fn new() -> Self {
        let verifier = Arc::new(MockIdentityVerifier::new());
        let identities = InMemoryIdentityRepository::new();
        let resolver = Arc::new(IdentityResolver::new(
            verifier.clone(),
            Arc::new(identities.clone()),
        ));
        Self {
            registry: Arc::new(InMemoryConnectionRegistry::new()),
            rooms: InMemoryRoomRepository::new(),
            identities,
            verifier,
            resolver,
            bus: Arc::new(InMemoryEventBus::recording()),
            locks: Arc::new(EventLocks::new()),
            partitioner: Arc::new(RoomPartitioner::seeded(17)),
        }
    }

    pub fn deps(&self) -> LifecycleDeps {
        LifecycleDeps {
            registry: self.registry.clone(),
            resolver: self.resolver.clone(),
            rooms: Arc::new(self.rooms.clone()),
            publisher: self.bus.clone(),
            partitioner: self.partitioner.clone(),
            locks: self.locks.clone(),
            max_rooms: None,
        }
    }

    /// Like [`deps`](Self::deps) with different room storage.
    pub fn deps_with_rooms(&self, rooms: Arc<dyn RoomRepository>) -> LifecycleDeps {
        LifecycleDeps {
            rooms,
            ..self.deps()
        }
    }

    pub fn event() -> EventId {
        EventId::new("townhall-1").unwrap()
    }

    pub fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    pub fn grant() -> ModeratorGrant {
        ModeratorGrant::new(Self::user("moderator"), Self::event())
    }

    /// Resolves a fresh connection for `user` and joins it to the event.
    pub async fn connect(&self, user: &str) -> ConnectionId {
        let token = format!("tok-{}", user);
        let user_id = Self::user(user);
        self.verifier.add_token(
            token.clone(),
            AuthenticatedUser::new(user_id, format!("{}@example.com", user), None),
        );
        let connection = ConnectionId::new();
        self.resolver
            .on_connect(connection, &ConnectionCredentials::bearer(token))
            .await
            .unwrap();
        self.registry.join(connection, Scope::Event(Self::event()));
        connection
    }

    /// Joins a connection to the event without resolving its identity.
    pub fn connect_anonymous(&self) -> ConnectionId {
        let connection = ConnectionId::new();
        self.registry.join(connection, Scope::Event(Self::event()));
        connection
    }
}

/// Room storage that acts in the middle of a lifecycle operation: it can
/// disconnect a connection on the first write, or never finish an insert.
pub(crate) struct InterleavedRooms {
    inner: InMemoryRoomRepository,
    registry: Arc<InMemoryConnectionRegistry>,
    disconnect_on_write: Mutex<Option<ConnectionId>>,
    hang_on_insert: Option<usize>,
    inserts: AtomicUsize,
}

impl InterleavedRooms {
    pub fn new(fx: &Fixture) -> Self {
        Self {
            inner: fx.rooms.clone(),
            registry: fx.registry.clone(),
            disconnect_on_write: Mutex::new(None),
            hang_on_insert: None,
            inserts: AtomicUsize::new(0),
        }
    }

    /// Removes `connection` from the registry during the next write.
    pub fn disconnect_on_write(self, connection: ConnectionId) -> Self {
        *self
            .disconnect_on_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(connection);
        self
    }

    /// The `nth` insert (1-based) never completes.
    pub fn hang_on_insert(mut self, nth: usize) -> Self {
        self.hang_on_insert = Some(nth);
        self
    }

    fn on_write(&self) {
        let victim = self
            .disconnect_on_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(connection) = victim {
            self.registry.remove_connection(connection);
        }
    }
}

#[async_trait]
impl RoomRepository for InterleavedRooms {
    async fn insert(&self, room: &Room) -> Result<RoomId, DomainError> {
        let nth = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.hang_on_insert == Some(nth) {
            std::future::pending::<()>().await;
        }
        self.on_write();
        self.inner.insert(room).await
    }

    async fn deactivate_by_event(&self, event_id: &EventId) -> Result<u64, DomainError> {
        self.inner.deactivate_by_event(event_id).await
    }

    async fn deactivate(&self, room_id: &RoomId) -> Result<(), DomainError> {
        self.inner.deactivate(room_id).await
    }

    async fn update_members(&self, room: &Room) -> Result<(), DomainError> {
        self.on_write();
        self.inner.update_members(room).await
    }

    async fn find_by_id(&self, room_id: &RoomId) -> Result<Option<Room>, DomainError> {
        self.inner.find_by_id(room_id).await
    }

    async fn find_active_by_event(&self, event_id: &EventId) -> Result<Vec<Room>, DomainError> {
        self.inner.find_active_by_event(event_id).await
    }

    async fn find_containing_member(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Vec<Room>, DomainError> {
        self.inner.find_containing_member(event_id, user_id).await
    }
}
