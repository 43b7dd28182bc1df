use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json};
use tracing::{error, info};

use crate::AppState;
use crate::db::StoreError;
use crate::models::{
    CreateNoteRequest, ErrorResponse, NoteListResponse, NoteResponse, NoteUpdate, UpdateNoteRequest,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn store_error(context: &str, e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(_) => ErrorResponse::reply(StatusCode::NOT_FOUND, "Note not found"),
        StoreError::InvalidInput(msg) => ErrorResponse::reply(StatusCode::BAD_REQUEST, msg),
        e => {
            error!("{}: {}", context, e);
            ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", context, e))
        }
    }
}

/// Create a note under a fresh room token
pub async fn create_note(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
    let store = app_state.hub.coordinator().store();
    let note = store
        .create(request.title.trim(), &request.content)
        .await
        .map_err(|e| store_error("Failed to create note", e))?;

    info!("Created note {} ('{}')", note.room_token, note.title);
    Ok((StatusCode::CREATED, Json(NoteResponse { success: true, data: note })))
}

/// List all notes, most recently updated first
pub async fn list_notes(
    State(app_state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<NoteListResponse>), ApiError> {
    let notes = app_state
        .hub
        .coordinator()
        .store()
        .list_all()
        .await
        .map_err(|e| store_error("Failed to list notes", e))?;
    Ok((StatusCode::OK, Json(NoteListResponse { success: true, data: notes })))
}

/// Get a note by room token
pub async fn get_note(
    State(app_state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
    let note = app_state
        .hub
        .coordinator()
        .store()
        .find_by_room_token(&room_id)
        .await
        .map_err(|e| store_error("Failed to load note", e))?;
    Ok((StatusCode::OK, Json(NoteResponse { success: true, data: note })))
}

/// Partially update a note
pub async fn update_note(
    State(app_state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(request): Json<UpdateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
    let update = NoteUpdate::from(request);
    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "title must not be blank"));
    }

    let coordinator = app_state.hub.coordinator();
    let note = coordinator
        .store()
        .update(&room_id, update.clone())
        .await
        .map_err(|e| store_error("Failed to update note", e))?;

    // Keep a live room's cache in line with what was just written
    coordinator.sync_external(&room_id, &update);
    Ok((StatusCode::OK, Json(NoteResponse { success: true, data: note })))
}
