//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod breakout;
pub mod presence;

pub use breakout::{
    ChangeRoomCommand, ChangeRoomHandler, ChangeRoomOutcome, EndBreakoutCommand,
    EndBreakoutHandler, EndBreakoutResult, EventLocks, FindMyRoomHandler, FindMyRoomQuery,
    LifecycleDeps, RoomLifecycleManager, StartBreakoutCommand, StartBreakoutHandler,
    StartBreakoutResult, StartedRoom,
};
pub use presence::{
    ConnectClientCommand, ConnectClientHandler, ConnectClientResult, DisconnectClientHandler,
    DisconnectClientResult, IdentityResolver,
};
