//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, scopes, events, and error types
//! that form the vocabulary of the presence subsystem.

mod auth;
mod authorization;
mod command;
mod errors;
mod events;
mod ids;
mod scope;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use authorization::ModeratorGrant;
pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    BreakoutEnded, BreakoutStarted, ChatMessageEvent, EnvelopeId, EventEnvelope, EventMetadata,
    LiveEvent, LiveEventKind, RoomAssignment, RoomChanged,
};
pub use ids::{ConnectionId, EventId, RoomId, UserId};
pub use scope::Scope;
pub use timestamp::Timestamp;
