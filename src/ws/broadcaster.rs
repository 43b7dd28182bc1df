use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::connctx::{ConnCtx, ConnectionId, Outbound};
use super::registry::SessionRegistry;
use crate::models::{CursorMovedMessage, ServerEvent};

/// Delivers events to the members of a room.
///
/// Delivery is fire-and-forget: a closed or unknown peer is skipped and
/// never aborts the fan-out.
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
    conns: DashMap<ConnectionId, Arc<ConnCtx>>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry, conns: DashMap::new() }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Make `conn` reachable for delivery
    pub fn attach(&self, conn: ConnectionId, outbound: Outbound) {
        self.conns.insert(conn, Arc::new(ConnCtx::new(outbound)));
    }

    /// Stop delivering to `conn`. Idempotent.
    pub fn detach(&self, conn: &ConnectionId) {
        self.conns.remove(conn);
    }

    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }

    /// Deliver `event` to a single connection
    pub fn send_to(&self, conn: &ConnectionId, event: Arc<ServerEvent>) -> bool {
        let Some(ctx) = self.conns.get(conn).map(|c| Arc::clone(c.value())) else {
            debug!("Dropping event for unknown connection {}", conn);
            return false;
        };
        if ctx.outbound.send(event).is_err() {
            debug!("Outbound queue of {} is closed", conn);
            return false;
        }
        true
    }

    /// Deliver `event` to every member of `room` except `exclude`.
    /// Returns how many peers accepted it.
    pub fn broadcast(&self, room: &str, event: ServerEvent, exclude: Option<&ConnectionId>) -> usize {
        let members = self.registry.members_of(room);
        let event = Arc::new(event);
        let mut delivered = 0;
        for member in members.iter().filter(|m| Some(*m) != exclude) {
            if self.send_to(member, event.clone()) {
                delivered += 1;
            }
        }
        debug!("Broadcast to room {}: {}/{} peers", room, delivered, members.len());
        delivered
    }

    /// Remember the last cursor `conn` reported in `room`
    pub fn record_cursor(&self, conn: &ConnectionId, room: &str, cursor: CursorMovedMessage) {
        if let Some(ctx) = self.conns.get(conn) {
            *ctx.cursor.lock() = Some((room.to_string(), cursor));
        }
    }

    /// Forget the cursor of `conn`; it moved out of its room
    pub fn clear_cursor(&self, conn: &ConnectionId) {
        if let Some(ctx) = self.conns.get(conn) {
            *ctx.cursor.lock() = None;
        }
    }

    /// Last known cursors of the members of `room`, except `exclude`.
    /// Cursors reported in any other room are skipped.
    pub fn cursors_in(&self, room: &str, exclude: &ConnectionId) -> Vec<CursorMovedMessage> {
        self.registry
            .members_of(room)
            .iter()
            .filter(|m| *m != exclude)
            .filter_map(|m| {
                let ctx = self.conns.get(m)?;
                let cursor = match &*ctx.cursor.lock() {
                    Some((at, cursor)) if at == room => Some(cursor.clone()),
                    _ => None,
                };
                cursor
            })
            .collect()
    }
}
