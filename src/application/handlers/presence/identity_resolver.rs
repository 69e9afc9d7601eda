//! IdentityResolver - binds live connections to durable identities.
//!
//! Maintains the reverse index (connection → user) that breakout start uses
//! to decide which persisted user each live connection belongs to.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::breakout::BreakoutError;
use crate::domain::foundation::{AuthenticatedUser, ConnectionId, UserId};
use crate::ports::{ConnectionCredentials, IdentityRepository, IdentityVerifier};

pub struct IdentityResolver {
    verifier: Arc<dyn IdentityVerifier>,
    identities: Arc<dyn IdentityRepository>,
}

impl IdentityResolver {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        identities: Arc<dyn IdentityRepository>,
    ) -> Self {
        Self {
            verifier,
            identities,
        }
    }

    /// Verifies credentials and records the connection on the identity.
    ///
    /// On `AuthenticationFailed` nothing was written; the caller closes the
    /// connection without joining any scope.
    pub async fn on_connect(
        &self,
        connection_id: ConnectionId,
        credentials: &ConnectionCredentials,
    ) -> Result<AuthenticatedUser, BreakoutError> {
        let user = self.verifier.verify(credentials).await.map_err(|e| {
            tracing::info!(connection_id = %connection_id, error = %e, "Connection rejected");
            BreakoutError::AuthenticationFailed(e)
        })?;

        self.identities
            .add_live_connection(&user, connection_id)
            .await?;

        tracing::debug!(
            connection_id = %connection_id,
            user_id = %user.id,
            "Connection bound to identity"
        );
        Ok(user)
    }

    /// Drops the connection from whichever identity recorded it.
    ///
    /// Safe to call for every disconnect: a connection that was never
    /// resolved is simply not found.
    pub async fn on_disconnect(&self, connection_id: ConnectionId) -> Result<(), BreakoutError> {
        let resolved = self
            .identities
            .find_by_connection_ids(&[connection_id])
            .await?;

        if let Some(user_id) = resolved.get(&connection_id) {
            self.identities
                .remove_live_connection(user_id, connection_id)
                .await?;
        }
        Ok(())
    }

    /// Maps each live connection to its identity.
    ///
    /// Connections no identity has recorded (not yet resolved, or already
    /// disconnected) are absent from the result.
    pub async fn resolve_identities(
        &self,
        connections: &[ConnectionId],
    ) -> Result<HashMap<ConnectionId, UserId>, BreakoutError> {
        Ok(self.identities.find_by_connection_ids(connections).await?)
    }
}
