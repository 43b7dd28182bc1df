use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::broadcaster::Broadcaster;
use super::connctx::ConnectionId;
use crate::db::{NoteStore, StoreError};
use crate::models::{CursorMovedMessage, Note, NoteLoadedMessage, NoteUpdate, ServerEvent};

/// Last known state of one room plus its single debounce slot
#[derive(Default)]
struct RoomDocState {
    title: Option<String>,
    content: Option<String>,
    /// Bumped on every staged change; a timer only fires for its own generation
    generation: u64,
    pending: Option<JoinHandle<()>>,
    writes_in_flight: u32,
    /// Room emptied while a save was outstanding
    release_when_idle: bool,
    /// Last write failed; the cached values are the only copy
    unsaved: bool,
    evicted: bool,
}

impl RoomDocState {
    fn is_idle(&self) -> bool {
        self.pending.is_none() && self.writes_in_flight == 0
    }

    fn can_release(&self) -> bool {
        self.is_idle() && !self.unsaved
    }
}

#[derive(Default)]
struct RoomSlot {
    state: Mutex<RoomDocState>,
    /// Serializes store writes for this room
    write_gate: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct SaveStats {
    saved: AtomicU64,
    failed: AtomicU64,
}

/// Counters surfaced by diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub slots: usize,
    pub pending_saves: usize,
    pub saves_ok: u64,
    pub saves_failed: u64,
}

/// Applies edits to the per-room cache, relays them to peers right away and
/// schedules one debounced save per room.
///
/// Each room has its own lock; rooms never contend with each other. Content
/// and title changes share the room's single timer, so a burst of either
/// collapses into one write carrying the latest of both.
pub struct EditCoordinator {
    store: Arc<dyn NoteStore>,
    broadcaster: Arc<Broadcaster>,
    debounce: Duration,
    slots: DashMap<String, Arc<RoomSlot>>,
    stats: SaveStats,
}

impl EditCoordinator {
    pub fn new(store: Arc<dyn NoteStore>, broadcaster: Arc<Broadcaster>, debounce: Duration) -> Self {
        Self {
            store,
            broadcaster,
            debounce,
            slots: DashMap::new(),
            stats: SaveStats::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn NoteStore> {
        &self.store
    }

    pub fn on_edit_received(self: &Arc<Self>, conn: &ConnectionId, room: &str, content: String) {
        debug!("Edit from {} in room {} ({} chars)", conn, room, content.len());
        let relay = ServerEvent::NoteUpdated(content.clone());
        self.stage(conn, room, None, Some(content), relay);
    }

    pub fn on_title_received(self: &Arc<Self>, conn: &ConnectionId, room: &str, title: String) {
        debug!("Title change from {} in room {}", conn, room);
        let relay = ServerEvent::TitleUpdated(title.clone());
        self.stage(conn, room, Some(title), None, relay);
    }

    /// Cursor moves are relayed only, never persisted
    pub fn on_cursor_received(&self, conn: &ConnectionId, room: &str, position: u64, user_id: String) {
        let cursor = CursorMovedMessage { position, user_id };
        self.broadcaster.record_cursor(conn, room, cursor.clone());
        self.broadcaster.broadcast(room, ServerEvent::CursorMoved(cursor), Some(conn));
    }

    fn slot(&self, room: &str) -> Arc<RoomSlot> {
        if let Some(slot) = self.slots.get(room) {
            return Arc::clone(slot.value());
        }
        let entry = self.slots.entry(room.to_string()).or_insert_with(|| Arc::new(RoomSlot::default()));
        Arc::clone(entry.value())
    }

    /// Record the new values, relay them to the peers and re-arm the room's
    /// timer. The relay happens under the room lock so it is ordered against
    /// `send_loaded`.
    fn stage(
        self: &Arc<Self>,
        conn: &ConnectionId,
        room: &str,
        title: Option<String>,
        content: Option<String>,
        relay: ServerEvent,
    ) {
        let (mut title, mut content) = (title, content);
        loop {
            let slot = self.slot(room);
            let mut st = slot.state.lock();
            if st.evicted {
                // Lost a race with release(); the map already holds a fresh slot
                continue;
            }
            if let Some(title) = title.take() {
                st.title = Some(title);
            }
            if let Some(content) = content.take() {
                st.content = Some(content);
            }

            st.generation += 1;
            if let Some(previous) = st.pending.take() {
                previous.abort();
            }
            let generation = st.generation;
            let this = Arc::clone(self);
            let task_slot = Arc::clone(&slot);
            let task_room = room.to_string();
            st.pending = Some(tokio::spawn(async move {
                this.fire(task_room, task_slot, generation).await;
            }));
            self.broadcaster.broadcast(room, relay, Some(conn));
            return;
        }
    }

    async fn fire(self: Arc<Self>, room: String, slot: Arc<RoomSlot>, generation: u64) {
        tokio::time::sleep(self.debounce).await;

        // Snapshot whatever is current now, not what armed the timer
        let update = {
            let mut st = slot.state.lock();
            if st.generation != generation || st.evicted {
                return;
            }
            st.pending = None;
            st.writes_in_flight += 1;
            NoteUpdate { title: st.title.clone(), content: st.content.clone() }
        };

        let gate = slot.write_gate.lock().await;
        let unsaved = match self.store.update(&room, update).await {
            Ok(note) => {
                self.stats.saved.fetch_add(1, Ordering::Relaxed);
                info!("Saved note {} ({} chars)", room, note.content.len());
                false
            }
            Err(StoreError::NotFound(_)) => {
                // Nothing to retry against
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!("Failed to save note {}: no such note", room);
                false
            }
            Err(e) => {
                // The cached state stays, even if the room empties; the next
                // edit in this room retries
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!("Failed to save note {}: {}", room, e);
                true
            }
        };
        drop(gate);

        let release = {
            let mut st = slot.state.lock();
            st.writes_in_flight -= 1;
            st.unsaved = unsaved;
            st.release_when_idle && st.can_release()
        };
        if release {
            self.release(&room);
        }
    }

    /// Drop the cached state of a room nobody is in anymore.
    ///
    /// A room with an outstanding save keeps its slot until that save is done.
    /// A room whose last save failed keeps it until a later save succeeds.
    pub fn release(&self, room: &str) {
        let removed = self.slots.remove_if(room, |_, slot| {
            let mut st = slot.state.lock();
            if st.can_release() {
                st.evicted = true;
                true
            } else {
                st.release_when_idle = true;
                false
            }
        });
        if removed.is_some() {
            debug!("Released coordinator slot for room {}", room);
        }
    }

    /// Cancel a deferred release because someone joined again
    pub fn retain(&self, room: &str) {
        if let Some(slot) = self.slots.get(room) {
            slot.state.lock().release_when_idle = false;
        }
    }

    /// Send `conn` the note as it currently stands in `room`: the stored
    /// record with any cached title/content from this room laid over it.
    ///
    /// Holds the room lock while sending, so an edit relayed to `conn` is
    /// either already in the snapshot or arrives after it.
    pub fn send_loaded(&self, conn: &ConnectionId, room: &str, note: Note) -> bool {
        let sent = loop {
            let slot = self.slot(room);
            let st = slot.state.lock();
            if st.evicted {
                continue;
            }
            let loaded = NoteLoadedMessage {
                title: st.title.clone().unwrap_or(note.title),
                content: st.content.clone().unwrap_or(note.content),
            };
            break self.broadcaster.send_to(conn, Arc::new(ServerEvent::NoteLoaded(loaded)));
        };
        // The joiner may already be gone again
        if self.broadcaster.registry().members_of(room).is_empty() {
            self.release(room);
        }
        sent
    }

    /// Fold a write that bypassed the socket into the room cache, so a later
    /// debounced save does not put stale values back
    pub fn sync_external(&self, room: &str, update: &NoteUpdate) {
        if let Some(slot) = self.slots.get(room) {
            let mut st = slot.state.lock();
            if let Some(title) = &update.title {
                st.title = Some(title.clone());
            }
            if let Some(content) = &update.content {
                st.content = Some(content.clone());
            }
        }
    }

    pub fn stats(&self) -> CoordinatorStats {
        let pending_saves = self
            .slots
            .iter()
            .filter(|slot| slot.state.lock().pending.is_some())
            .count();
        CoordinatorStats {
            slots: self.slots.len(),
            pending_saves,
            saves_ok: self.stats.saved.load(Ordering::Relaxed),
            saves_failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }
}
