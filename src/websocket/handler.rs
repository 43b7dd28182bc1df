use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use tracing::{info, warn, debug, error};
use futures_util::{StreamExt, SinkExt};

use crate::AppState;
use crate::models::ClientEvent;
use crate::ws::{CollabHub, ConnectionId};
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_leave_handler::handle_leave_message;
use crate::websocket::msg_update_handler::{handle_update_message, handle_title_message};
use crate::websocket::msg_cursor_handler::handle_cursor_message;
use crate::websocket::msg_ping_handler::handle_ping_message;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state.hub.clone()))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<CollabHub>) {
    // Register the connection; cleanup runs however this function exits
    let (connection_id, mut outbound) = hub.connect();
    let _cleanup = hub.disconnect_guard(connection_id.clone());

    info!("WebSocket connection established with connection_id: {}", connection_id);
    let (mut sender, mut receiver) = socket.split();

    // Only this task writes to the socket, so per-sender order is kept
    let writer_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&*event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize event for {}: {}", writer_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                debug!("Socket of {} closed while sending", writer_id);
                break;
            }
        }
    });

    let reader_hub = hub.clone();
    let reader_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => handle_text_frame(&reader_hub, &reader_id, &text).await,
                Ok(Message::Close(_)) => break,
                Ok(Message::Binary(_)) => warn!("Dropping binary frame from {}", reader_id),
                // Ping/Pong frames are answered by the socket layer
                Ok(_) => {}
                Err(e) => {
                    debug!("Socket error on {}: {}", reader_id, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
    info!("WebSocket connection {} terminated", connection_id);
}

/// Parse one inbound text frame and route it. Malformed frames are dropped;
/// the connection stays open.
pub async fn handle_text_frame(hub: &Arc<CollabHub>, connection_id: &ConnectionId, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Dropping malformed event from {}: {}", connection_id, e);
            return;
        }
    };

    match event {
        ClientEvent::JoinRoom(room_token) => handle_join_message(hub, connection_id, room_token).await,
        ClientEvent::LeaveRoom(room_token) => handle_leave_message(hub, connection_id, room_token),
        ClientEvent::NoteUpdate(update_msg) => handle_update_message(hub, connection_id, update_msg),
        ClientEvent::TitleUpdate(title_msg) => handle_title_message(hub, connection_id, title_msg),
        ClientEvent::CursorPosition(cursor_msg) => handle_cursor_message(hub, connection_id, cursor_msg),
        ClientEvent::Ping => handle_ping_message(hub, connection_id),
    }
}
