//! Outbound delivery port: push one message to one live connection.

use thiserror::Error;

use crate::domain::foundation::ConnectionId;
use crate::domain::presence::ServerMessage;

/// Why a single delivery did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The connection is gone (or was never known to this sink).
    #[error("Connection {0} is not connected")]
    Disconnected(ConnectionId),

    /// The connection's outbound buffer is full.
    #[error("Outbound buffer full for connection {0}")]
    Backpressure(ConnectionId),
}

/// Fire-and-forget delivery to one connection.
///
/// Must not block: a slow client is reported as `Backpressure` rather than
/// stalling the caller. Delivery is at-most-once.
pub trait ConnectionSink: Send + Sync {
    fn send(&self, connection: &ConnectionId, message: ServerMessage)
        -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_sink_is_object_safe() {
        fn _accepts_dyn(_sink: &dyn ConnectionSink) {}
    }
}
