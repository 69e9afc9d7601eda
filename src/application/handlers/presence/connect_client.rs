//! ConnectClientHandler - Admits a new live connection to an event.
//!
//! Order: verify identity, record the connection on the identity, join the
//! event scope, then restore any breakout room the user already belongs to.
//! A rejected connection never reaches the registry.

use std::sync::Arc;

use crate::application::handlers::breakout::RoomLifecycleManager;
use crate::domain::breakout::{BreakoutError, Room};
use crate::domain::foundation::{AuthenticatedUser, ConnectionId, EventId, Scope};
use crate::domain::presence::Connection;
use crate::ports::{ConnectionCredentials, ConnectionRegistry};

use super::IdentityResolver;

#[derive(Debug, Clone)]
pub struct ConnectClientCommand {
    pub connection_id: ConnectionId,
    pub event_id: EventId,
    pub credentials: ConnectionCredentials,
}

#[derive(Debug, Clone)]
pub struct ConnectClientResult {
    pub user: AuthenticatedUser,
    pub connection: Connection,
    /// Breakout room the connection was placed in, if any.
    pub room: Option<Room>,
}

pub struct ConnectClientHandler {
    resolver: Arc<IdentityResolver>,
    registry: Arc<dyn ConnectionRegistry>,
    lifecycle: Arc<RoomLifecycleManager>,
}

impl ConnectClientHandler {
    pub fn new(
        resolver: Arc<IdentityResolver>,
        registry: Arc<dyn ConnectionRegistry>,
        lifecycle: Arc<RoomLifecycleManager>,
    ) -> Self {
        Self {
            resolver,
            registry,
            lifecycle,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConnectClientCommand,
    ) -> Result<ConnectClientResult, BreakoutError> {
        let user = self
            .resolver
            .on_connect(cmd.connection_id, &cmd.credentials)
            .await?;

        let mut connection = Connection::with_id(cmd.connection_id, cmd.event_id.clone());
        connection.resolve(user.id.clone());

        let event_scope = Scope::Event(cmd.event_id.clone());
        self.registry.join(cmd.connection_id, event_scope.clone());

        // Room recovery failing does not cost the user the main scope.
        let room = match self
            .lifecycle
            .rejoin(cmd.event_id.clone(), user.id.clone(), |room_id| {
                self.registry
                    .assign_room_if_in(cmd.connection_id, &event_scope, *room_id)
            })
            .await
        {
            Ok(room) => room,
            Err(e) => {
                tracing::warn!(
                    connection_id = %cmd.connection_id,
                    event_id = %cmd.event_id,
                    error = %e,
                    "Room recovery failed, staying in main scope"
                );
                None
            }
        };

        tracing::info!(
            connection_id = %cmd.connection_id,
            event_id = %cmd.event_id,
            user_id = %user.id,
            room_id = ?room.as_ref().map(|r| r.id().to_string()),
            "Client connected"
        );

        Ok(ConnectClientResult {
            user,
            connection,
            room,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::breakout::test_support::Fixture;
    use crate::domain::foundation::{AuthError, CommandMetadata, UserId};

    fn handler(fx: &Fixture) -> (ConnectClientHandler, Arc<RoomLifecycleManager>) {
        let lifecycle = Arc::new(RoomLifecycleManager::new(fx.deps()));
        let handler =
            ConnectClientHandler::new(fx.resolver.clone(), fx.registry.clone(), lifecycle.clone());
        (handler, lifecycle)
    }

    fn cmd(token: &str) -> ConnectClientCommand {
        ConnectClientCommand {
            connection_id: ConnectionId::new(),
            event_id: Fixture::event(),
            credentials: ConnectionCredentials::bearer(token),
        }
    }

    fn register(fx: &Fixture, token: &str, user: &str) {
        fx.verifier.add_token(
            token,
            AuthenticatedUser::new(UserId::new(user).unwrap(), format!("{}@example.com", user), None),
        );
    }

    #[tokio::test]
    async fn connect_joins_event_scope() {
        let fx = Fixture::new();
        register(&fx, "tok", "alice");
        let (handler, _) = handler(&fx);
        let command = cmd("tok");
        let connection_id = command.connection_id;

        let result = handler.handle(command).await.unwrap();

        assert_eq!(result.user.id.as_str(), "alice");
        assert!(result.connection.is_resolved());
        assert!(result.room.is_none());
        assert_eq!(
            fx.registry.scopes_of(connection_id),
            vec![Scope::Event(Fixture::event())]
        );
    }

    #[tokio::test]
    async fn rejected_connection_joins_nothing() {
        let fx = Fixture::new();
        let (handler, _) = handler(&fx);
        let command = cmd("unknown");
        let connection_id = command.connection_id;

        let err = handler.handle(command).await.unwrap_err();

        assert_eq!(err, BreakoutError::AuthenticationFailed(AuthError::InvalidToken));
        assert!(fx.registry.scopes_of(connection_id).is_empty());
    }

    #[tokio::test]
    async fn reconnect_restores_breakout_room() {
        let fx = Fixture::new();
        register(&fx, "tok-a", "alice");
        register(&fx, "tok-b", "bob");
        let (handler, lifecycle) = handler(&fx);

        let first = cmd("tok-a");
        let first_id = first.connection_id;
        handler.handle(first).await.unwrap();
        handler.handle(cmd("tok-b")).await.unwrap();
        let started = lifecycle
            .start(Fixture::event(), 1, &Fixture::grant(), CommandMetadata::new())
            .await
            .unwrap();
        let room_id = started.room_ids()[0];

        // Drop the first connection, come back with a new one
        fx.registry.remove_connection(first_id);
        fx.resolver.on_disconnect(first_id).await.unwrap();
        let again = cmd("tok-a");
        let again_id = again.connection_id;
        let result = handler.handle(again).await.unwrap();

        assert_eq!(result.room.map(|r| *r.id()), Some(room_id));
        assert_eq!(fx.registry.room_of(again_id), Some(room_id));
    }
}
