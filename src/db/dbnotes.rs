use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, error, info};

use super::notestore::{validate_title, NoteStore, StoreError, MAX_TOKEN_ATTEMPTS};
use crate::models::{Note, NoteUpdate};
use crate::services::token_service::generate_room_token;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS notes (
        room_token TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS notes_updated_at_idx ON notes (updated_at DESC)";

/// Postgres backed note store
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    /// Create a new database connection pool and make sure the schema exists
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX_SQL).execute(&self.pool).await?;
        debug!("Notes schema ready");
        Ok(())
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn create(&self, title: &str, content: &str) -> Result<Note, StoreError> {
        validate_title(title)?;
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let room_token = generate_room_token();
            let inserted = sqlx::query_as::<_, Note>(
                r#"
                INSERT INTO notes (room_token, title, content)
                VALUES ($1, $2, $3)
                ON CONFLICT (room_token) DO NOTHING
                RETURNING room_token, title, content, created_at, updated_at
                "#,
            )
            .bind(&room_token)
            .bind(title)
            .bind(content)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to insert note: {}", e);
                e
            })?;

            match inserted {
                Some(note) => return Ok(note),
                None => debug!("Room token collision on {}, retrying", room_token),
            }
        }
        Err(StoreError::TokenExhausted(MAX_TOKEN_ATTEMPTS))
    }

    async fn find_by_room_token(&self, room_token: &str) -> Result<Note, StoreError> {
        sqlx::query_as::<_, Note>(
            "SELECT room_token, title, content, created_at, updated_at FROM notes WHERE room_token = $1",
        )
        .bind(room_token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(room_token.to_string()))
    }

    async fn update(&self, room_token: &str, update: NoteUpdate) -> Result<Note, StoreError> {
        sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                updated_at = now()
            WHERE room_token = $1
            RETURNING room_token, title, content, created_at, updated_at
            "#,
        )
        .bind(room_token)
        .bind(update.title)
        .bind(update.content)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(room_token.to_string()))
    }

    async fn list_all(&self) -> Result<Vec<Note>, StoreError> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT room_token, title, content, created_at, updated_at FROM notes ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }
}
