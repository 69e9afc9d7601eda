//! DisconnectClientHandler - Tears down a closed connection.
//!
//! The registry is cleaned first and unconditionally; identity cleanup is
//! best-effort. Disconnect never fails.

use std::sync::Arc;

use crate::domain::foundation::{ConnectionId, Scope};
use crate::ports::ConnectionRegistry;

use super::IdentityResolver;

#[derive(Debug, Clone, Default)]
pub struct DisconnectClientResult {
    /// Scopes the connection was removed from.
    pub scopes_left: Vec<Scope>,
    /// False when identity cleanup failed and was only logged.
    pub identity_cleared: bool,
}

pub struct DisconnectClientHandler {
    resolver: Arc<IdentityResolver>,
    registry: Arc<dyn ConnectionRegistry>,
}

impl DisconnectClientHandler {
    pub fn new(resolver: Arc<IdentityResolver>, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { resolver, registry }
    }

    pub async fn handle(&self, connection_id: ConnectionId) -> DisconnectClientResult {
        let scopes_left = self.registry.remove_connection(connection_id);

        let identity_cleared = match self.resolver.on_disconnect(connection_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    connection_id = %connection_id,
                    error = %e,
                    "Identity cleanup failed on disconnect"
                );
                false
            }
        };

        tracing::info!(
            connection_id = %connection_id,
            scopes = scopes_left.len(),
            "Client disconnected"
        );

        DisconnectClientResult {
            scopes_left,
            identity_cleared,
        }
    }
}
