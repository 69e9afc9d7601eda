//! Application layer - Commands, Queries, and Handlers.
//!
//! Orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    // Lifecycle
    ChangeRoomCommand, ChangeRoomOutcome, EndBreakoutResult, EventLocks, LifecycleDeps,
    RoomLifecycleManager, StartBreakoutResult,
    // Presence
    ConnectClientCommand, ConnectClientHandler, ConnectClientResult, DisconnectClientHandler,
    IdentityResolver,
};
