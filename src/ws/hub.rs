use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::broadcaster::Broadcaster;
use super::connctx::{ConnectionId, OutboundRx};
use super::coordinator::EditCoordinator;
use super::registry::SessionRegistry;
use crate::db::{NoteStore, StoreError};
use crate::models::{PongMessage, ServerEvent};
use crate::utils::scope_guard::ScopeGuard;

/// Ties membership, fan-out and the edit coordinator together and owns the
/// lifecycle of every connection.
pub struct CollabHub {
    registry: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
    coordinator: Arc<EditCoordinator>,
}

impl CollabHub {
    pub fn new(store: Arc<dyn NoteStore>, save_debounce: Duration) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let coordinator = Arc::new(EditCoordinator::new(store, broadcaster.clone(), save_debounce));
        Self { registry, broadcaster, coordinator }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn coordinator(&self) -> &Arc<EditCoordinator> {
        &self.coordinator
    }

    /// Register a new connection that is in no room yet
    pub fn connect(&self) -> (ConnectionId, OutboundRx) {
        let conn = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.broadcaster.attach(conn.clone(), tx);
        info!("Connection {} registered", conn);
        (conn, rx)
    }

    /// Guard that disconnects `conn` when dropped, whichever way the
    /// connection task ends
    pub fn disconnect_guard(self: &Arc<Self>, conn: ConnectionId) -> ScopeGuard<impl FnOnce()> {
        let hub = Arc::clone(self);
        ScopeGuard::new(move || hub.disconnect(&conn))
    }

    pub fn is_member(&self, conn: &ConnectionId, room: &str) -> bool {
        self.registry.room_of(conn).as_deref() == Some(room)
    }

    /// Move `conn` into `room`, telling former and new peers.
    /// Returns false if it was already there.
    pub fn join(&self, conn: &ConnectionId, room: &str) -> bool {
        let outcome = self.registry.join(conn, room);

        if let Some(previous) = &outcome.left {
            info!("Connection {} left room {} to join {}", conn, previous, room);
            self.broadcaster.clear_cursor(conn);
            self.broadcaster.broadcast(previous, ServerEvent::UserLeft(conn.to_string()), Some(conn));
            if outcome.left_room_emptied {
                self.coordinator.release(previous);
            }
        }

        if !outcome.joined {
            debug!("Connection {} already in room {}", conn, room);
            return false;
        }

        info!("Connection {} joined room {}", conn, room);
        self.coordinator.retain(room);
        self.broadcaster.broadcast(room, ServerEvent::UserJoined(conn.to_string()), Some(conn));
        true
    }

    /// Send the joiner the note as it currently stands and where its peers'
    /// cursors are. A failed lookup leaves membership untouched.
    pub async fn send_room_state(&self, conn: &ConnectionId, room: &str) {
        match self.coordinator.store().find_by_room_token(room).await {
            Ok(note) => {
                self.coordinator.send_loaded(conn, room, note);
            }
            Err(StoreError::NotFound(_)) => {
                warn!("Connection {} joined room {} which has no stored note", conn, room);
            }
            Err(e) => {
                warn!("Failed to load note for room {}: {}", room, e);
            }
        }

        for cursor in self.broadcaster.cursors_in(room, conn) {
            self.broadcaster.send_to(conn, Arc::new(ServerEvent::CursorMoved(cursor)));
        }
    }

    pub fn leave(&self, conn: &ConnectionId, room: &str) {
        let Some(emptied) = self.registry.leave(conn, room) else {
            debug!("Connection {} is not in room {}, ignoring leave", conn, room);
            return;
        };
        info!("Connection {} left room {}", conn, room);
        self.broadcaster.clear_cursor(conn);
        self.broadcaster.broadcast(room, ServerEvent::UserLeft(conn.to_string()), Some(conn));
        if emptied {
            self.coordinator.release(room);
        }
    }

    /// Tear down everything `conn` owns. Safe to call more than once.
    pub fn disconnect(&self, conn: &ConnectionId) {
        // Detach first so nothing else is ever queued for this identity
        self.broadcaster.detach(conn);
        if let Some((room, emptied)) = self.registry.remove(conn) {
            self.broadcaster.broadcast(&room, ServerEvent::UserLeft(conn.to_string()), Some(conn));
            if emptied {
                self.coordinator.release(&room);
            }
        }
        info!("Connection {} disconnected", conn);
    }

    pub fn pong(&self, conn: &ConnectionId) {
        let pong = ServerEvent::Pong(PongMessage { date: Utc::now().to_rfc3339() });
        self.broadcaster.send_to(conn, Arc::new(pong));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::RecordingStore;
    use crate::models::{CursorMovedMessage, NoteLoadedMessage};
    use tokio::time::{sleep, Instant};

    const D: Duration = Duration::from_millis(500);

    async fn hub_with_room(room: &str) -> (Arc<CollabHub>, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::new());
        store.seed(room, "Groceries", "milk").await;
        (Arc::new(CollabHub::new(store.clone(), D)), store)
    }

    fn drain(rx: &mut OutboundRx) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push((*event).clone());
        }
        events
    }

    #[tokio::test]
    async fn join_notifies_peers_but_not_the_joiner() {
        let (hub, _) = hub_with_room("abc123").await;
        let (a, mut rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();

        assert!(hub.join(&a, "abc123"));
        assert!(drain(&mut rx_a).is_empty());

        assert!(hub.join(&b, "abc123"));
        assert_eq!(drain(&mut rx_a), vec![ServerEvent::UserJoined(b.to_string())]);
        assert!(drain(&mut rx_b).is_empty());

        // Rejoining is a no-op
        assert!(!hub.join(&b, "abc123"));
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn switching_rooms_tells_old_peers() {
        let (hub, _) = hub_with_room("one").await;
        let (a, _rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        let (c, mut rx_c) = hub.connect();
        hub.join(&b, "one");
        hub.join(&c, "two");
        hub.join(&a, "one");
        drain(&mut rx_b);

        hub.join(&a, "two");
        assert_eq!(drain(&mut rx_b), vec![ServerEvent::UserLeft(a.to_string())]);
        assert_eq!(drain(&mut rx_c), vec![ServerEvent::UserJoined(a.to_string())]);
        assert_eq!(hub.registry().room_of(&a).as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn disconnect_sends_one_user_left_and_nothing_after() {
        let (hub, _) = hub_with_room("abc123").await;
        let (a, mut rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        hub.join(&a, "abc123");
        hub.join(&b, "abc123");
        drain(&mut rx_a);

        hub.disconnect(&b);
        hub.disconnect(&b);
        assert_eq!(drain(&mut rx_a), vec![ServerEvent::UserLeft(b.to_string())]);
        assert_eq!(hub.registry().members_of("abc123"), vec![a.clone()]);

        hub.coordinator().on_edit_received(&a, "abc123", "after".into());
        hub.broadcaster().broadcast("abc123", ServerEvent::UserJoined("x".into()), None);
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(hub.broadcaster().connection_count(), 1);
    }

    #[tokio::test]
    async fn guard_disconnects_on_drop() {
        let (hub, _) = hub_with_room("abc123").await;
        let (a, mut rx_a) = hub.connect();
        let (b, _rx_b) = hub.connect();
        hub.join(&a, "abc123");
        hub.join(&b, "abc123");
        drain(&mut rx_a);

        {
            let _guard = hub.disconnect_guard(b.clone());
        }
        assert_eq!(drain(&mut rx_a), vec![ServerEvent::UserLeft(b.to_string())]);
        assert_eq!(hub.registry().room_of(&b), None);
    }

    #[tokio::test]
    async fn explicit_leave_is_scoped_to_the_named_room() {
        let (hub, _) = hub_with_room("abc123").await;
        let (a, mut rx_a) = hub.connect();
        let (b, _rx_b) = hub.connect();
        hub.join(&a, "abc123");
        hub.join(&b, "abc123");
        drain(&mut rx_a);

        hub.leave(&b, "elsewhere");
        assert!(drain(&mut rx_a).is_empty());
        hub.leave(&b, "abc123");
        assert_eq!(drain(&mut rx_a), vec![ServerEvent::UserLeft(b.to_string())]);
        assert!(!hub.is_member(&b, "abc123"));
    }

    #[tokio::test]
    async fn missing_note_does_not_break_membership() {
        let (hub, _) = hub_with_room("abc123").await;
        let (a, mut rx_a) = hub.connect();
        hub.join(&a, "nosuchroom");
        hub.send_room_state(&a, "nosuchroom").await;

        assert!(hub.is_member(&a, "nosuchroom"));
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn joiner_gets_note_and_peer_cursors() {
        let (hub, _) = hub_with_room("abc123").await;
        let (a, _rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        hub.join(&a, "abc123");
        hub.coordinator().on_cursor_received(&a, "abc123", 3, "user-a".into());
        hub.coordinator().on_edit_received(&a, "abc123", "milk, eggs".into());

        hub.join(&b, "abc123");
        hub.send_room_state(&b, "abc123").await;
        assert_eq!(drain(&mut rx_b), vec![
            ServerEvent::NoteLoaded(NoteLoadedMessage { title: "Groceries".into(), content: "milk, eggs".into() }),
            ServerEvent::CursorMoved(CursorMovedMessage { position: 3, user_id: "user-a".into() }),
        ]);
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let (hub, _) = hub_with_room("abc123").await;
        let (a, mut rx_a) = hub.connect();
        hub.pong(&a);
        match drain(&mut rx_a).as_slice() {
            [ServerEvent::Pong(pong)] => assert!(!pong.date.is_empty()),
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn two_clients_one_burst_one_write() {
        let (hub, store) = hub_with_room("abc123").await;
        let (a, _rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        let t0 = Instant::now();

        hub.join(&a, "abc123");
        hub.coordinator().on_edit_received(&a, "abc123", "hello".into());
        sleep(Duration::from_millis(50)).await;
        hub.join(&b, "abc123");
        hub.send_room_state(&b, "abc123").await;
        sleep(Duration::from_millis(50)).await;
        hub.coordinator().on_edit_received(&a, "abc123", "hello world".into());
        sleep(Duration::from_secs(1)).await;

        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].update.content.as_deref(), Some("hello world"));
        assert_eq!(saves[0].at - t0, Duration::from_millis(600));
        // b sees "hello" live, never from the store
        assert_eq!(drain(&mut rx_b), vec![
            ServerEvent::NoteLoaded(NoteLoadedMessage { title: "Groceries".into(), content: "hello".into() }),
            ServerEvent::NoteUpdated("hello world".into()),
        ]);
    }

    #[tokio::test]
    async fn cursor_does_not_follow_a_connection_into_another_room() {
        let (hub, _) = hub_with_room("two").await;
        let (a, _rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        hub.join(&a, "one");
        hub.coordinator().on_cursor_received(&a, "one", 42, "user-a".into());

        hub.join(&a, "two");
        hub.join(&b, "two");
        hub.send_room_state(&b, "two").await;
        assert_eq!(drain(&mut rx_b), vec![
            ServerEvent::NoteLoaded(NoteLoadedMessage { title: "Groceries".into(), content: "milk".into() }),
        ]);

        // Back in room one, the old cursor is gone as well
        let (c, mut rx_c) = hub.connect();
        hub.join(&a, "one");
        hub.join(&c, "one");
        hub.send_room_state(&c, "one").await;
        assert!(drain(&mut rx_c).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_in_emptied_room_is_retried_by_next_edit() {
        let (hub, store) = hub_with_room("abc123").await;
        store.set_failing(true);
        let (a, _rx_a) = hub.connect();
        hub.join(&a, "abc123");
        hub.coordinator().on_title_received(&a, "abc123", "Party plan".into());
        hub.disconnect(&a);

        sleep(D * 2).await;
        assert_eq!(hub.coordinator().stats().saves_failed, 1);
        assert_eq!(hub.coordinator().stats().slots, 1);

        store.set_failing(false);
        let (b, mut rx_b) = hub.connect();
        hub.join(&b, "abc123");
        hub.send_room_state(&b, "abc123").await;
        assert_eq!(drain(&mut rx_b), vec![
            ServerEvent::NoteLoaded(NoteLoadedMessage { title: "Party plan".into(), content: "milk".into() }),
        ]);
        hub.coordinator().on_edit_received(&b, "abc123", "cake".into());
        sleep(D * 2).await;

        let note = store.find_by_room_token("abc123").await.unwrap();
        assert_eq!((note.title.as_str(), note.content.as_str()), ("Party plan", "cake"));

        hub.disconnect(&b);
        assert_eq!(hub.coordinator().stats().slots, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn last_one_out_still_gets_saved() {
        let (hub, store) = hub_with_room("abc123").await;
        let (a, _rx_a) = hub.connect();
        hub.join(&a, "abc123");
        hub.coordinator().on_edit_received(&a, "abc123", "parting edit".into());
        hub.disconnect(&a);

        sleep(D * 2).await;
        assert_eq!(store.find_by_room_token("abc123").await.unwrap().content, "parting edit");
        assert_eq!(hub.coordinator().stats().slots, 0);
    }
}
