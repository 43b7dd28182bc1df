use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// List notes, most recently updated first
#[utoipa::path(
    get,
    path = "/api/notes",
    responses(
        (status = 200, description = "All notes", body = NoteListResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_notes_doc() {}

/// Create a new note
#[utoipa::path(
    post,
    path = "/api/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Blank title", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_note_doc() {}

/// Get a note by room token
#[utoipa::path(
    get,
    path = "/api/notes/{room_id}",
    params(("room_id" = String, Path, description = "Room token")),
    responses(
        (status = 200, description = "The note", body = NoteResponse),
        (status = 404, description = "No such note", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_note_doc() {}

/// Partially update a note
#[utoipa::path(
    put,
    path = "/api/notes/{room_id}",
    params(("room_id" = String, Path, description = "Room token")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Updated note", body = NoteResponse),
        (status = 404, description = "No such note", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_note_doc() {}

/// Session and host statistics
#[utoipa::path(
    get,
    path = "/api/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        list_notes_doc,
        create_note_doc,
        get_note_doc,
        update_note_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            Note,
            NoteResponse,
            NoteListResponse,
            CreateNoteRequest,
            UpdateNoteRequest,
            ErrorResponse,
            DiagnosticsResponse
        )
    ),
    tags(
        (name = "notes", description = "Shared notes")
    )
)]
pub struct ApiDoc;
