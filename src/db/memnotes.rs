use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::notestore::{validate_title, NoteStore, StoreError, MAX_TOKEN_ATTEMPTS};
use crate::models::{Note, NoteUpdate};
use crate::services::token_service::generate_room_token;

/// Process-local note store, used when no database is configured
#[derive(Default)]
pub struct MemoryNoteStore {
    notes: RwLock<HashMap<String, Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        info!("Using in-memory note store - notes will not survive a restart");
        Self::default()
    }

    /// Insert a note under a caller chosen token
    #[cfg(test)]
    pub async fn insert(&self, note: Note) {
        self.notes.write().await.insert(note.room_token.clone(), note);
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn create(&self, title: &str, content: &str) -> Result<Note, StoreError> {
        validate_title(title)?;
        let mut notes = self.notes.write().await;
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let room_token = generate_room_token();
            if notes.contains_key(&room_token) {
                debug!("Room token collision on {}, retrying", room_token);
                continue;
            }
            let now = Utc::now();
            let note = Note {
                room_token: room_token.clone(),
                title: title.to_string(),
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            };
            notes.insert(room_token, note.clone());
            return Ok(note);
        }
        Err(StoreError::TokenExhausted(MAX_TOKEN_ATTEMPTS))
    }

    async fn find_by_room_token(&self, room_token: &str) -> Result<Note, StoreError> {
        self.notes
            .read()
            .await
            .get(room_token)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(room_token.to_string()))
    }

    async fn update(&self, room_token: &str, update: NoteUpdate) -> Result<Note, StoreError> {
        let mut notes = self.notes.write().await;
        let note = notes
            .get_mut(room_token)
            .ok_or_else(|| StoreError::NotFound(room_token.to_string()))?;
        if let Some(title) = update.title {
            note.title = title;
        }
        if let Some(content) = update.content {
            note.content = content;
        }
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn list_all(&self) -> Result<Vec<Note>, StoreError> {
        let mut notes: Vec<Note> = self.notes.read().await.values().cloned().collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }
}
