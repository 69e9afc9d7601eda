//! Identity repository port.
//!
//! The identity documents are owned by the wider platform; this subsystem
//! only reads and writes each identity's live-connection set.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{AuthenticatedUser, ConnectionId, DomainError, UserId};

/// Persistence port for the connection → identity reverse index.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Records a live connection for the user, creating the identity record
    /// if it does not exist yet. Adding the same connection twice is a no-op.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn add_live_connection(
        &self,
        user: &AuthenticatedUser,
        connection_id: ConnectionId,
    ) -> Result<(), DomainError>;

    /// Drops a live connection. Unknown users and unknown connections are
    /// not errors.
    async fn remove_live_connection(
        &self,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Result<(), DomainError>;

    /// Finds the identity each connection belongs to.
    ///
    /// Connections recorded by no identity are absent from the map.
    async fn find_by_connection_ids(
        &self,
        connection_ids: &[ConnectionId],
    ) -> Result<HashMap<ConnectionId, UserId>, DomainError>;
}
