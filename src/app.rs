//! Service assembly: storage, handlers, fan-out, and the HTTP router.

use std::sync::Arc;

use axum::{routing::get, Router};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::adapters::events::InMemoryEventBus;
use crate::adapters::postgres::{PostgresIdentityRepository, PostgresRoomRepository};
use crate::adapters::presence::InMemoryConnectionRegistry;
use crate::adapters::storage::{InMemoryIdentityRepository, InMemoryRoomRepository};
use crate::adapters::websocket::{
    live_router, EventFanOut, LiveState, WebSocketConnections, DEFAULT_MAX_FRAME_BYTES,
};
use crate::application::{
    ConnectClientHandler, DisconnectClientHandler, EventLocks, IdentityResolver, LifecycleDeps,
    RoomLifecycleManager,
};
use crate::config::{BreakoutConfig, ConfigError, DatabaseConfig, ServerConfig, ValidationError};
use crate::domain::breakout::RoomPartitioner;
use crate::domain::foundation::AuthError;
use crate::ports::{
    EventPublisher, IdentityRepository, IdentityVerifier, ModeratorDirectory, RoomRepository,
};

/// Failures while starting the service.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Identity verifier setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable collaborators.
#[derive(Clone)]
pub struct Storage {
    pub rooms: Arc<dyn RoomRepository>,
    pub identities: Arc<dyn IdentityRepository>,
}

impl Storage {
    pub fn in_memory() -> Self {
        Self {
            rooms: Arc::new(InMemoryRoomRepository::new()),
            identities: Arc::new(InMemoryIdentityRepository::new()),
        }
    }

    /// PostgreSQL when configured, in-memory otherwise.
    pub async fn from_config(database: Option<&DatabaseConfig>) -> Result<Self, StartupError> {
        let Some(database) = database else {
            tracing::warn!("No database configured, rooms and identities are kept in memory");
            return Ok(Self::in_memory());
        };

        let pool = database.connect().await?;
        if database.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");
        }
        Ok(Self {
            rooms: Arc::new(PostgresRoomRepository::new(pool.clone())),
            identities: Arc::new(PostgresIdentityRepository::new(pool)),
        })
    }
}

/// Fully wired presence subsystem.
pub struct Services {
    pub live: LiveState,
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub bus: Arc<InMemoryEventBus>,
    pub fan_out: Arc<EventFanOut>,
}

impl Services {
    pub fn build(
        verifier: Arc<dyn IdentityVerifier>,
        storage: Storage,
        moderators: Arc<dyn ModeratorDirectory>,
        breakout: &BreakoutConfig,
    ) -> Self {
        Self::build_with_bus(
            verifier,
            storage,
            moderators,
            breakout,
            Arc::new(InMemoryEventBus::new()),
        )
    }

    /// Like [`build`](Self::build) with a caller-supplied bus.
    pub fn build_with_bus(
        verifier: Arc<dyn IdentityVerifier>,
        storage: Storage,
        moderators: Arc<dyn ModeratorDirectory>,
        breakout: &BreakoutConfig,
        bus: Arc<InMemoryEventBus>,
    ) -> Self {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let connections = Arc::new(WebSocketConnections::new(breakout.channel_capacity));
        let resolver = Arc::new(IdentityResolver::new(verifier, storage.identities));

        let lifecycle = Arc::new(RoomLifecycleManager::new(LifecycleDeps {
            registry: registry.clone(),
            resolver: resolver.clone(),
            rooms: storage.rooms,
            publisher: bus.clone(),
            partitioner: Arc::new(RoomPartitioner::from_seed(breakout.shuffle_seed)),
            locks: Arc::new(EventLocks::new()),
            max_rooms: breakout.max_rooms,
        }));

        let fan_out = EventFanOut::new_shared(registry.clone(), connections.clone());
        fan_out.register(bus.as_ref());

        let live = LiveState {
            connect: Arc::new(ConnectClientHandler::new(
                resolver.clone(),
                registry.clone(),
                lifecycle.clone(),
            )),
            disconnect: Arc::new(DisconnectClientHandler::new(resolver, registry.clone())),
            lifecycle,
            moderators,
            connections,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        };

        Self {
            live,
            registry,
            bus,
            fan_out,
        }
    }

    /// Where the message store publishes chat events.
    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.bus.clone()
    }
}

/// HTTP surface: the live endpoint plus a health probe.
pub fn router(mut live: LiveState, server: &ServerConfig) -> Router {
    live.max_frame_bytes = server.ws_max_frame_bytes;
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(live_router())
        .with_state(live)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(server))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<http::HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any)
    } else {
        CorsLayer::new().allow_origin(origins).allow_methods(Any)
    }
}
