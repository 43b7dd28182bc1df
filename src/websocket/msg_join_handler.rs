use std::sync::Arc;
use tracing::{info, warn};

use crate::services::token_service::is_plausible_room_token;
use crate::ws::{CollabHub, ConnectionId};

/// Handle join-room
pub async fn handle_join_message(hub: &Arc<CollabHub>, conn: &ConnectionId, room_token: String) {
    if !is_plausible_room_token(&room_token) {
        warn!("Connection {} sent join-room with an invalid room token", conn);
        return;
    }
    info!("Join requested by {} for room {}", conn, room_token);

    if hub.join(conn, &room_token) {
        hub.send_room_state(conn, &room_token).await;
    }
}
