//! WebSocket adapters for live event connections.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   InMemoryEventBus                            │
//! │   message.*   breakout.started   breakout.ended   room_changed│
//! └──────────────────────────────────────────────────────────────┘
//!                              │ subscribes
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        EventFanOut                            │
//! │   resolves the target scope against the ConnectionRegistry    │
//! └──────────────────────────────────────────────────────────────┘
//!                              │ ConnectionSink::send
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   WebSocketConnections                        │
//! │   conn-a: mpsc ──▶ socket     conn-b: mpsc ──▶ socket         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Client → server protocol
//! - [`connections`] - Bounded outbound queue per connection
//! - [`handler`] - Axum upgrade handler and per-connection command loop
//! - [`event_bridge`] - Fan-out from the event bus to connections

pub mod connections;
pub mod event_bridge;
pub mod handler;
pub mod messages;

pub use connections::WebSocketConnections;
pub use event_bridge::{EventFanOut, FanOutReport};
pub use handler::{live_router, ws_handler, LiveSession, LiveState, DEFAULT_MAX_FRAME_BYTES};
pub use messages::ClientMessage;
