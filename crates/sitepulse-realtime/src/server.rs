//! WebSocket endpoint.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use sitepulse_core::types::UserId;

use crate::gateway::RealtimeGateway;
use crate::message::{ClientMessage, ServerEvent};

#[derive(Debug, Deserialize)]
struct WsParams {
    user_id: UserId,
}

/// Router exposing the live-connection endpoint at `/ws`.
pub fn router(gateway: Arc<RealtimeGateway>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(gateway)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<RealtimeGateway>>,
    Query(params): Query<WsParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, gateway, params.user_id))
}

async fn handle_socket(socket: WebSocket, gateway: Arc<RealtimeGateway>, user_id: UserId) {
    let (connection_id, mut events) = gateway.register(user_id);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(%error, "failed to serialize realtime event");
                    }
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&gateway, connection_id, user_id, text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!(%error, connection_id = connection_id.0, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    gateway.unregister(connection_id);
}

fn handle_client_message(
    gateway: &RealtimeGateway,
    connection_id: crate::connection::ConnectionId,
    user_id: UserId,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(error) => {
            debug!(%error, connection_id = connection_id.0, "ignoring malformed client message");
            return;
        }
    };

    match message {
        ClientMessage::JoinGroup { group } => gateway.join_group(connection_id, &group),
        ClientMessage::LeaveGroup { group } => gateway.leave_group(connection_id, &group),
        ClientMessage::Ping => {
            gateway.push_to_user(user_id, &ServerEvent::Pong);
        }
    }
}
