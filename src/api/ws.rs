//! WebSocket sessions for peers.
//!
//! Each socket is split in two: a writer task drains the connection's
//! outbound channel to the socket, and the reader loop feeds inbound frames
//! to a [`Session`]. Closing the socket, or a failed write, unregisters the
//! peer.

use crate::{
    deliberation::{Coordinator, Query},
    peers::{ConnectionHandle, Peer},
    protocol::{ClientEvent, ServerEvent},
    types::{AppError, Result},
    AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let max_message_size = state.config.websocket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state.coordinator))
}

async fn handle_socket(socket: WebSocket, coordinator: Arc<Coordinator>) {
    let (connection, mut outbound) = ConnectionHandle::channel();
    let connection_id = connection.id();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut sink, mut stream) = socket.split();
    let session = Session::new(coordinator, connection);
    session.reply(ServerEvent::welcome());

    let mut writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(event.as_ref()) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, kind = event.kind(), "Failed to serialize event");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text.into())).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket write failed");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()),
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => session.handle_text(text),
                    Err(_) => session.reply(ServerEvent::error(&AppError::MalformedEvent(
                        "binary frame is not valid UTF-8".to_string(),
                    ))),
                },
                Some(Ok(Message::Close(_))) | None => break,
                // Pings are answered by axum
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(connection_id = %connection_id, error = %e, "WebSocket read failed");
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    session.close();
    writer.abort();
    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// One peer connection's view of the coordinator.
///
/// Transport-free so it can be driven directly; the socket loop only moves
/// frames in and out.
pub struct Session {
    coordinator: Arc<Coordinator>,
    connection: ConnectionHandle,
}

impl Session {
    pub fn new(coordinator: Arc<Coordinator>, connection: ConnectionHandle) -> Self {
        Self {
            coordinator,
            connection,
        }
    }

    /// Handle one inbound text frame. Failures are reported to the sender
    /// as an `error` event; nothing is propagated.
    pub fn handle_text(&self, text: &str) {
        let result = ClientEvent::parse(text).and_then(|event| self.handle_event(event));
        if let Err(e) = result {
            debug!(connection_id = %self.connection.id(), error = %e, "Rejected client event");
            self.reply(ServerEvent::error(&e));
        }
    }

    pub fn handle_event(&self, event: ClientEvent) -> Result<()> {
        let registry = self.coordinator.registry();
        registry.touch(&self.connection.id());

        match event {
            ClientEvent::Register { platform, user_id } => {
                let peer = self
                    .coordinator
                    .register_peer(platform, user_id, self.connection.clone());
                self.reply(ServerEvent::Registered {
                    peer_id: peer.id,
                    platform: peer.platform,
                    connected_peers: registry.snapshot().iter().map(Peer::summary).collect(),
                });
            }
            ClientEvent::UserMessage {
                content,
                user_id,
                conversation_id,
            } => {
                let platform = self
                    .peer()
                    .map(|p| p.platform)
                    .unwrap_or_else(|| "websocket".to_string());
                let mut query = Query::new(content, user_id).with_platform(platform);
                if let Some(conversation_id) = conversation_id {
                    query = query.with_conversation(conversation_id);
                }

                let started = self.coordinator.start_round(query)?;
                self.reply(ServerEvent::MessageReceived {
                    message_id: started.message_id,
                    round_id: started.round_id,
                    required_responses: started.required_responses,
                    recipients: started.recipients,
                    status: "broadcast".to_string(),
                });
            }
            ClientEvent::AgentResponse {
                round_id,
                platform,
                content,
            } => {
                let peer = self.peer().ok_or_else(|| {
                    AppError::UnknownPeer("register before sending responses".to_string())
                })?;
                let platform = platform.unwrap_or(peer.platform);

                let outcome = self
                    .coordinator
                    .submit_response(&round_id, peer.id, platform, content)?;
                self.reply(ServerEvent::ResponseRecorded {
                    round_id,
                    counted: outcome.counted(),
                    count: outcome.count,
                    required: outcome.required,
                });
            }
            ClientEvent::StatusRequest => {
                let status = self.coordinator.status();
                self.reply(ServerEvent::Status {
                    connected_peers: status.connected_peers,
                    total_connections: status.total_connections,
                    total_messages: status.total_messages,
                    active_rounds: status.active_rounds,
                    timestamp: Utc::now(),
                });
            }
        }

        Ok(())
    }

    fn peer(&self) -> Option<Peer> {
        self.coordinator
            .registry()
            .peer_for_connection(&self.connection.id())
    }

    /// Send an event to this connection only.
    pub fn reply(&self, event: ServerEvent) {
        if let Err(e) = self.connection.send(Arc::new(event)) {
            debug!(error = %e, "Reply dropped");
        }
    }

    /// Unregister the peer behind this session, if it registered.
    pub fn close(&self) -> Option<Peer> {
        self.coordinator.disconnect(&self.connection.id())
    }
}
