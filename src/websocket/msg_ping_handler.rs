use std::sync::Arc;
use tracing::debug;

use crate::ws::{CollabHub, ConnectionId};

/// Handle ping - reply with a pong carrying the server time
pub fn handle_ping_message(hub: &Arc<CollabHub>, conn: &ConnectionId) {
    debug!("Ping received from {}", conn);
    hub.pong(conn);
}
