//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Presence Ports
//!
//! - `ConnectionRegistry` - In-process scope membership (synchronous)
//! - `ConnectionSink` - Fire-and-forget delivery to one connection
//! - `IdentityVerifier` - Credentials → authenticated user
//! - `IdentityRepository` - Live-connection set per identity
//! - `ModeratorDirectory` - Who may run breakouts for an event
//!
//! ## Breakout Ports
//!
//! - `RoomRepository` - Room persistence
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `EventSubscriber` - Port for subscribing to domain events
//! - `EventHandler` - Handler that processes incoming events

mod connection_registry;
mod connection_sink;
mod event_publisher;
mod event_subscriber;
mod identity_repository;
mod identity_verifier;
mod moderator_directory;
mod room_repository;

pub use connection_registry::ConnectionRegistry;
pub use connection_sink::{ConnectionSink, DeliveryError};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use identity_repository::IdentityRepository;
pub use identity_verifier::{ConnectionCredentials, IdentityVerifier};
pub use moderator_directory::ModeratorDirectory;
pub use room_repository::RoomRepository;
