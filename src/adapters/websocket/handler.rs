//! WebSocket upgrade handler for live event connections.
//!
//! Connection lifecycle:
//! 1. Register an outbound queue for the new connection
//! 2. Verify the token and join the event (restoring any breakout room)
//! 3. Pump the outbound queue to the socket and client commands to handlers
//! 4. On close: leave every scope, drop the identity link, drop the queue

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::application::{
    ChangeRoomOutcome, ConnectClientCommand, ConnectClientHandler, DisconnectClientHandler,
    RoomLifecycleManager,
};
use crate::domain::breakout::BreakoutError;
use crate::domain::foundation::{
    AuthenticatedUser, CommandMetadata, ConnectionId, ErrorCode, EventId, ModeratorGrant,
};
use crate::domain::presence::ServerMessage;
use crate::ports::{ConnectionCredentials, ConnectionSink, ModeratorDirectory};

use super::connections::WebSocketConnections;
use super::messages::ClientMessage;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct LiveState {
    pub connect: Arc<ConnectClientHandler>,
    pub disconnect: Arc<DisconnectClientHandler>,
    pub lifecycle: Arc<RoomLifecycleManager>,
    pub moderators: Arc<dyn ModeratorDirectory>,
    pub connections: Arc<WebSocketConnections>,
    /// Inbound message size cap applied at upgrade.
    pub max_frame_bytes: usize,
}

/// Inbound cap used until the router applies the configured one.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct LiveParams {
    token: Option<String>,
}

/// Handle WebSocket upgrade requests for an event.
///
/// Route: `GET /events/:event_id/live?token=...`. A bearer
/// `Authorization` header takes precedence over the query token.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(event_id): Path<String>,
    Query(params): Query<LiveParams>,
    headers: HeaderMap,
    State(state): State<LiveState>,
) -> Response {
    let event_id = match EventId::new(event_id) {
        Ok(id) => id,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    let credentials = credentials_from(&headers, params.token);

    let limit = state.max_frame_bytes;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| handle_socket(socket, event_id, credentials, state))
}

fn credentials_from(headers: &HeaderMap, query_token: Option<String>) -> ConnectionCredentials {
    let header_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    match header_token.or(query_token) {
        Some(token) => ConnectionCredentials::bearer(token),
        None => ConnectionCredentials::anonymous(),
    }
}

async fn handle_socket(
    socket: WebSocket,
    event_id: EventId,
    credentials: ConnectionCredentials,
    state: LiveState,
) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = ConnectionId::new();

    // Registered before joining so no fan-out message is lost.
    let outbound = state.connections.register(connection_id);

    let connected = match state
        .connect
        .handle(ConnectClientCommand {
            connection_id,
            event_id: event_id.clone(),
            credentials,
        })
        .await
    {
        Ok(result) => result,
        Err(e) => {
            state.connections.unregister(&connection_id);
            let reply = ServerMessage::error(e.code(), e.to_string());
            let _ = send_message(&mut sender, &reply).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let session = LiveSession {
        state: state.clone(),
        event_id: event_id.clone(),
        connection_id,
        user: connected.user,
    };
    session.reply(ServerMessage::connected(
        connection_id,
        event_id.clone(),
        session.user.id.clone(),
    ));
    if let Some(room) = &connected.room {
        session.reply(ServerMessage::room_assigned(
            event_id,
            *room.id(),
            Some(room.index()),
        ));
    }

    let mut send_task = tokio::spawn(pump_outbound(outbound, sender, connection_id));

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => session.on_text(&text).await,
                Ok(Message::Binary(_)) => {
                    tracing::warn!(
                        connection_id = %session.connection_id,
                        "Received unsupported binary message"
                    );
                }
                // Protocol-level ping/pong is answered by axum
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::debug!(
                        connection_id = %session.connection_id,
                        error = %e,
                        "Receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.disconnect.handle(connection_id).await;
    state.connections.unregister(&connection_id);
}

async fn pump_outbound(
    mut outbound: mpsc::Receiver<ServerMessage>,
    mut sender: futures::stream::SplitSink<WebSocket, Message>,
    connection_id: ConnectionId,
) {
    while let Some(msg) = outbound.recv().await {
        if let Err(e) = send_message(&mut sender, &msg).await {
            tracing::debug!(
                connection_id = %connection_id,
                error = %e,
                "Send error, closing connection"
            );
            break;
        }
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!(message_type = msg.type_name(), error = %e, "Serialize failed");
            Ok(())
        }
    }
}

/// One authenticated connection's command processing.
#[derive(Clone)]
pub struct LiveSession {
    state: LiveState,
    event_id: EventId,
    connection_id: ConnectionId,
    user: AuthenticatedUser,
}

impl LiveSession {
    pub fn new(
        state: LiveState,
        event_id: EventId,
        connection_id: ConnectionId,
        user: AuthenticatedUser,
    ) -> Self {
        Self {
            state,
            event_id,
            connection_id,
            user,
        }
    }

    async fn on_text(&self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            // Detached: closing the socket aborts the receive loop, and a
            // lifecycle change must not stop half-way through its writes.
            Ok(msg) if msg.requires_moderator() => {
                let session = self.clone();
                tokio::spawn(async move {
                    if let Some(reply) = session.handle(msg).await {
                        session.reply(reply);
                    }
                });
            }
            Ok(msg) => {
                if let Some(reply) = self.handle(msg).await {
                    self.reply(reply);
                }
            }
            Err(e) => self.reply(ServerMessage::error(
                ErrorCode::ValidationFailed,
                format!("Unrecognized message: {}", e),
            )),
        }
    }

    /// Runs one client command. Returns the direct reply, if any; lifecycle
    /// changes reach clients through the fan-out instead.
    pub async fn handle(&self, msg: ClientMessage) -> Option<ServerMessage> {
        let grant = if msg.requires_moderator() {
            match self.moderator_grant().await {
                Ok(grant) => Some(grant),
                Err(reply) => return Some(reply),
            }
        } else {
            None
        };
        let metadata = CommandMetadata::new()
            .with_correlation_id(self.connection_id.to_string())
            .with_source("websocket");

        match (msg, grant) {
            (ClientMessage::Ping, _) => Some(ServerMessage::pong()),
            (ClientMessage::RoomRequest, _) => Some(
                match self
                    .state
                    .lifecycle
                    .find_my_room(self.event_id.clone(), self.user.id.clone())
                    .await
                {
                    Ok(Some(room)) => ServerMessage::room_assigned(
                        self.event_id.clone(),
                        *room.id(),
                        Some(room.index()),
                    ),
                    Ok(None) => ServerMessage::room_none(self.event_id.clone()),
                    Err(e) => error_reply(e),
                },
            ),
            (ClientMessage::BreakoutStart { room_count }, Some(grant)) => self
                .state
                .lifecycle
                .start(self.event_id.clone(), room_count, &grant, metadata)
                .await
                .err()
                .map(error_reply),
            (ClientMessage::BreakoutEnd, Some(grant)) => self
                .state
                .lifecycle
                .end(self.event_id.clone(), &grant, metadata)
                .await
                .err()
                .map(error_reply),
            (msg @ ClientMessage::BreakoutChangeRoom { .. }, Some(grant)) => {
                let cmd = msg.change_room_command(&self.event_id)?;
                match self.state.lifecycle.change_room(cmd, &grant, metadata).await {
                    Ok(ChangeRoomOutcome::Moved { .. }) => None,
                    Ok(ChangeRoomOutcome::NotConnected) => Some(ServerMessage::error(
                        ErrorCode::IdentityNotFound,
                        "User has no live connection in the source room",
                    )),
                    Err(e) => Some(error_reply(e)),
                }
            }
            (_, None) => Some(ServerMessage::error(
                ErrorCode::Forbidden,
                "Moderator permission required",
            )),
        }
    }

    async fn moderator_grant(&self) -> Result<ModeratorGrant, ServerMessage> {
        match self
            .state
            .moderators
            .grant_for(&self.event_id, &self.user.id)
            .await
        {
            Ok(Some(grant)) => Ok(grant),
            Ok(None) => Err(ServerMessage::error(
                ErrorCode::Forbidden,
                "Moderator permission required",
            )),
            Err(e) => Err(ServerMessage::error(e.code, e.message)),
        }
    }

    fn reply(&self, msg: ServerMessage) {
        if let Err(e) = self.state.connections.send(&self.connection_id, msg) {
            tracing::debug!(connection_id = %self.connection_id, error = %e, "Reply dropped");
        }
    }
}

fn error_reply(err: BreakoutError) -> ServerMessage {
    if err.is_expected_outcome() {
        tracing::debug!(error = %err, "Lifecycle request had no effect");
    } else {
        tracing::warn!(error = %err, "Lifecycle request failed");
    }
    ServerMessage::error(err.code(), err.to_string())
}

/// Create axum router for the live endpoint.
pub fn live_router() -> axum::Router<LiveState> {
    use axum::routing::get;

    axum::Router::new().route("/events/:event_id/live", get(ws_handler))
}
