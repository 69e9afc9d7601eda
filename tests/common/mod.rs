//! Shared harness for integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::mpsc;

use townhall_presence::adapters::auth::MockIdentityVerifier;
use townhall_presence::adapters::events::InMemoryEventBus;
use townhall_presence::adapters::storage::{
    InMemoryIdentityRepository, InMemoryModeratorDirectory, InMemoryRoomRepository,
};
use townhall_presence::app::{Services, Storage};
use townhall_presence::application::{ConnectClientCommand, ConnectClientResult};
use townhall_presence::config::BreakoutConfig;
use townhall_presence::domain::foundation::{
    AuthenticatedUser, ConnectionId, EventId, ModeratorGrant, UserId,
};
use townhall_presence::domain::presence::ServerMessage;
use townhall_presence::ports::ConnectionCredentials;

pub struct Harness {
    pub services: Services,
    pub rooms: InMemoryRoomRepository,
    pub identities: InMemoryIdentityRepository,
    pub verifier: Arc<MockIdentityVerifier>,
}

/// A connected client and its outbound queue.
pub struct Client {
    pub id: ConnectionId,
    pub user: UserId,
    pub inbox: mpsc::Receiver<ServerMessage>,
    pub joined: ConnectClientResult,
}

impl Client {
    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn drain_types(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(|m| m.type_name()).collect()
    }
}

impl Harness {
    pub fn new() -> Self {
        let rooms = InMemoryRoomRepository::new();
        let identities = InMemoryIdentityRepository::new();
        let verifier = Arc::new(MockIdentityVerifier::new());
        let storage = Storage {
            rooms: Arc::new(rooms.clone()),
            identities: Arc::new(identities.clone()),
        };
        let services = Services::build_with_bus(
            verifier.clone(),
            storage,
            Arc::new(InMemoryModeratorDirectory::new()),
            &BreakoutConfig {
                shuffle_seed: Some(2024),
                ..Default::default()
            },
            Arc::new(InMemoryEventBus::recording()),
        );
        Self {
            services,
            rooms,
            identities,
            verifier,
        }
    }

    pub fn event() -> EventId {
        EventId::new("townhall-42").unwrap()
    }

    pub fn grant() -> ModeratorGrant {
        ModeratorGrant::new(UserId::new("host").unwrap(), Self::event())
    }

    /// Connects `user` with a fresh connection id.
    pub async fn connect(&self, user: &str) -> Client {
        let user_id = UserId::new(user).unwrap();
        let token = format!("token-{}", user);
        self.verifier.add_token(
            token.clone(),
            AuthenticatedUser::new(user_id.clone(), format!("{}@example.com", user), None),
        );

        let id = ConnectionId::new();
        let inbox = self.services.live.connections.register(id);
        let joined = self
            .services
            .live
            .connect
            .handle(ConnectClientCommand {
                connection_id: id,
                event_id: Self::event(),
                credentials: ConnectionCredentials::bearer(token),
            })
            .await
            .unwrap();

        Client {
            id,
            user: user_id,
            inbox,
            joined,
        }
    }

    pub async fn disconnect(&self, client: &Client) {
        self.services.live.disconnect.handle(client.id).await;
        self.services.live.connections.unregister(&client.id);
    }

    pub async fn connect_many(&self, count: usize) -> Vec<Client> {
        let mut clients = Vec::with_capacity(count);
        for i in 0..count {
            clients.push(self.connect(&format!("user-{}", i)).await);
        }
        clients
    }
}
