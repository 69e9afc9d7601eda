//! Per-connection outbound queues.
//!
//! Each live socket gets a bounded `mpsc` channel. The socket task drains
//! the receiver; everything else pushes through `ConnectionSink::send`,
//! which never waits: a full queue is reported as backpressure and the
//! message is dropped for that connection only.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::foundation::ConnectionId;
use crate::domain::presence::ServerMessage;
use crate::ports::{ConnectionSink, DeliveryError};

/// Default number of queued messages per connection.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// `ConnectionSink` backed by one bounded channel per connection.
pub struct WebSocketConnections {
    senders: RwLock<HashMap<ConnectionId, mpsc::Sender<ServerMessage>>>,
    channel_capacity: usize,
}

impl WebSocketConnections {
    /// # Arguments
    ///
    /// * `channel_capacity` - Buffer size of each connection's queue.
    ///   Clamped to at least 1.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Opens the outbound queue for a connection and returns its receiving
    /// end. Registering an id twice replaces (and closes) the old queue.
    pub fn register(&self, connection: ConnectionId) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection, tx);
        rx
    }

    /// Closes the connection's queue.
    pub fn unregister(&self, connection: &ConnectionId) {
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection);
    }

    pub fn is_registered(&self, connection: &ConnectionId) -> bool {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(connection)
    }

    pub fn connection_count(&self) -> usize {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for WebSocketConnections {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl ConnectionSink for WebSocketConnections {
    fn send(
        &self,
        connection: &ConnectionId,
        message: ServerMessage,
    ) -> Result<(), DeliveryError> {
        let sender = self
            .senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(connection)
            .cloned()
            .ok_or(DeliveryError::Disconnected(*connection))?;

        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backpressure(*connection),
            TrySendError::Closed(_) => DeliveryError::Disconnected(*connection),
        })
    }
}
