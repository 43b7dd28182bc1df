use std::sync::Arc;
use tracing::warn;

use crate::models::{NoteUpdateMessage, TitleUpdateMessage};
use crate::ws::{CollabHub, ConnectionId};

/// Handle note-update
pub fn handle_update_message(hub: &Arc<CollabHub>, conn: &ConnectionId, update_msg: NoteUpdateMessage) {
    if !hub.is_member(conn, &update_msg.room_token) {
        warn!("Dropping note-update from {} for room {} it has not joined", conn, update_msg.room_token);
        return;
    }
    hub.coordinator().on_edit_received(conn, &update_msg.room_token, update_msg.content);
}

/// Handle title-update
pub fn handle_title_message(hub: &Arc<CollabHub>, conn: &ConnectionId, title_msg: TitleUpdateMessage) {
    if !hub.is_member(conn, &title_msg.room_token) {
        warn!("Dropping title-update from {} for room {} it has not joined", conn, title_msg.room_token);
        return;
    }
    if title_msg.title.trim().is_empty() {
        warn!("Dropping blank title from {} for room {}", conn, title_msg.room_token);
        return;
    }
    hub.coordinator().on_title_received(conn, &title_msg.room_token, title_msg.title);
}
