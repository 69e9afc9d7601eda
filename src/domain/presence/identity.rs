//! Durable user identity with its live connection set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthenticatedUser, ConnectionId, UserId};

/// A user record as the presence layer stores it.
///
/// One user may hold several simultaneous connections (several tabs), so
/// `live_connections` is a set. Only that field is written by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_id: UserId,
    email: String,
    display_name: Option<String>,
    live_connections: BTreeSet<ConnectionId>,
}

impl Identity {
    /// Identity with no live connections yet.
    pub fn from_user(user: &AuthenticatedUser) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            live_connections: BTreeSet::new(),
        }
    }

    pub fn reconstitute(
        user_id: UserId,
        email: String,
        display_name: Option<String>,
        live_connections: BTreeSet<ConnectionId>,
    ) -> Self {
        Self {
            user_id,
            email,
            display_name,
            live_connections,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn live_connections(&self) -> &BTreeSet<ConnectionId> {
        &self.live_connections
    }

    pub fn has_connection(&self, connection_id: &ConnectionId) -> bool {
        self.live_connections.contains(connection_id)
    }

    /// Deduplicated append. Returns false if already present.
    pub fn add_connection(&mut self, connection_id: ConnectionId) -> bool {
        self.live_connections.insert(connection_id)
    }

    /// Returns false if the connection was not recorded.
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> bool {
        self.live_connections.remove(connection_id)
    }

    /// Refreshes profile fields from a newer token.
    pub fn refresh_profile(&mut self, user: &AuthenticatedUser) {
        self.email = user.email.clone();
        self.display_name = user.display_name.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::from_user(&AuthenticatedUser::new(
            UserId::new("u-1").unwrap(),
            "u1@example.com",
            None,
        ))
    }

    #[test]
    fn add_connection_deduplicates() {
        let mut identity = identity();
        let conn = ConnectionId::new();

        assert!(identity.add_connection(conn));
        assert!(!identity.add_connection(conn));
        assert_eq!(identity.live_connections().len(), 1);
    }

    #[test]
    fn remove_unknown_connection_is_harmless() {
        let mut identity = identity();
        assert!(!identity.remove_connection(&ConnectionId::new()));
    }

    #[test]
    fn supports_several_tabs() {
        let mut identity = identity();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        identity.add_connection(a);
        identity.add_connection(b);
        identity.remove_connection(&a);

        assert!(!identity.has_connection(&a));
        assert!(identity.has_connection(&b));
    }
}
