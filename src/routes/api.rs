use crate::{
    config::Config,
    docs::ApiDoc,
    handlers::{create_note, diagnostics, get_note, health_check, list_notes, ready_check, update_note},
    websocket::websocket_handler,
    AppState,
};
use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::{AllowOrigin, CorsLayer}, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create API routes
pub fn create_api_routes() -> Router<Arc<AppState>> {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/diagnostics", get(diagnostics))
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/:room_id", get(get_note).put(update_note))
}

/// Full application: REST API, collaboration socket and Swagger UI
pub fn create_app(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config);
    Router::<Arc<AppState>>::new()
        .nest("/api", create_api_routes())
        .route("/ws", get(websocket_handler))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}
