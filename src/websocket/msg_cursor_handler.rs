use std::sync::Arc;
use tracing::debug;

use crate::models::CursorPositionMessage;
use crate::ws::{CollabHub, ConnectionId};

/// Handle cursor-position
pub fn handle_cursor_message(hub: &Arc<CollabHub>, conn: &ConnectionId, cursor_msg: CursorPositionMessage) {
    if !hub.is_member(conn, &cursor_msg.room_token) {
        debug!("Dropping cursor from {} for room {} it has not joined", conn, cursor_msg.room_token);
        return;
    }
    hub.coordinator().on_cursor_received(conn, &cursor_msg.room_token, cursor_msg.position, cursor_msg.user_id);
}
