//! Adapters - Implementations of port interfaces.
//!
//! - `auth` - Token verification (JWKS, mock)
//! - `events` - Event bus
//! - `postgres` - Room and identity storage on PostgreSQL
//! - `presence` - Connection registry
//! - `storage` - In-memory storage for development and tests
//! - `websocket` - Live endpoint, outbound queues, fan-out

pub mod auth;
pub mod events;
pub mod postgres;
pub mod presence;
pub mod storage;
pub mod websocket;

pub use events::InMemoryEventBus;
pub use presence::InMemoryConnectionRegistry;
pub use websocket::{EventFanOut, WebSocketConnections};
