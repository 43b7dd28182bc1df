use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::memnotes::MemoryNoteStore;
use super::notestore::{NoteStore, StoreError};
use crate::models::{Note, NoteUpdate};

#[derive(Debug, Clone)]
pub struct SaveRecord {
    pub room: String,
    pub update: NoteUpdate,
    pub at: Instant,
}

/// In-memory store that records every update attempt and can be told to
/// fail or stall
pub struct RecordingStore {
    inner: MemoryNoteStore,
    saves: Mutex<Vec<SaveRecord>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryNoteStore::default(),
            saves: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    pub async fn seed(&self, room: &str, title: &str, content: &str) {
        let now = Utc::now();
        self.inner.insert(Note {
            room_token: room.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }).await;
    }

    pub fn saves(&self) -> Vec<SaveRecord> {
        self.saves.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

#[async_trait]
impl NoteStore for RecordingStore {
    async fn create(&self, title: &str, content: &str) -> Result<Note, StoreError> {
        self.inner.create(title, content).await
    }

    async fn find_by_room_token(&self, room_token: &str) -> Result<Note, StoreError> {
        self.inner.find_by_room_token(room_token).await
    }

    async fn update(&self, room_token: &str, update: NoteUpdate) -> Result<Note, StoreError> {
        self.saves.lock().push(SaveRecord {
            room: room_token.to_string(),
            update: update.clone(),
            at: Instant::now(),
        });
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.update(room_token, update).await
    }

    async fn list_all(&self) -> Result<Vec<Note>, StoreError> {
        self.inner.list_all().await
    }
}
