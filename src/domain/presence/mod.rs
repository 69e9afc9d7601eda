//! Presence module - connections, the identities behind them, and what
//! they can be told.

mod connection;
mod identity;
mod outbound;

pub use connection::Connection;
pub use identity::Identity;
pub use outbound::{
    ChatMessageNotice, ConnectedMessage, ErrorMessage, PongMessage, RoomAssignedMessage,
    RoomChangedMessage, RoomClearedMessage, RoomNoneMessage, ServerMessage,
};
