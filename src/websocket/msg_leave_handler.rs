use std::sync::Arc;
use tracing::warn;

use crate::services::token_service::is_plausible_room_token;
use crate::ws::{CollabHub, ConnectionId};

/// Handle leave-room
pub fn handle_leave_message(hub: &Arc<CollabHub>, conn: &ConnectionId, room_token: String) {
    if !is_plausible_room_token(&room_token) {
        warn!("Connection {} sent leave-room with an invalid room token", conn);
        return;
    }
    hub.leave(conn, &room_token);
}
