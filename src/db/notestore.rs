use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Note, NoteUpdate};

/// How many fresh tokens `create` tries before giving up
pub const MAX_TOKEN_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("note '{0}' not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("could not allocate a unique room token after {0} attempts")]
    TokenExhausted(usize),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable note storage keyed by room token.
///
/// The session layer only reads a note when someone joins its room and
/// writes it when a debounced save fires.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Create a note under a freshly generated room token
    async fn create(&self, title: &str, content: &str) -> Result<Note, StoreError>;

    async fn find_by_room_token(&self, room_token: &str) -> Result<Note, StoreError>;

    /// Apply a partial update and bump `updated_at`
    async fn update(&self, room_token: &str, update: NoteUpdate) -> Result<Note, StoreError>;

    /// All notes, most recently updated first
    async fn list_all(&self) -> Result<Vec<Note>, StoreError>;
}

/// Titles must contain something other than whitespace
pub fn validate_title(title: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::InvalidInput("title must not be blank".to_string()));
    }
    Ok(())
}
