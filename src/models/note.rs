use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A shared note. The room token doubles as its storage key.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "roomId")]
    pub room_token: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Request body for creating a note
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Request body for updating a note
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl From<UpdateNoteRequest> for NoteUpdate {
    fn from(req: UpdateNoteRequest) -> Self {
        NoteUpdate { title: req.title, content: req.content }
    }
}

/// Response wrapping a single note
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    pub success: bool,
    pub data: Note,
}

/// Response wrapping a list of notes
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NoteListResponse {
    pub success: bool,
    pub data: Vec<Note>,
}
