mod models;
mod handlers;
mod routes;
mod docs;
mod config;
mod db;
mod services;
mod utils;
mod websocket;
mod ws;

use std::panic;
use std::sync::Arc;
use config::Config;
use db::{MemoryNoteStore, NoteStore, PgNoteStore};
use routes::create_app;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ws::CollabHub;

/// Shared state handed to every handler
pub struct AppState {
    pub hub: Arc<CollabHub>,
    pub config: Config,
}

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "notes_collab=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    if config.is_development() {
        info!("Running in development mode");
    }

    let store = init_store(&config).await;
    let hub = Arc::new(CollabHub::new(store, config.save_debounce()));
    info!("Saving room edits {} ms after the last change", config.save_debounce_ms);

    let address = config.server_address();
    let app = create_app(Arc::new(AppState { hub, config }));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed to start");

    info!("Server stopped");
}

/// Postgres when a database URL is configured, memory otherwise
async fn init_store(config: &Config) -> Arc<dyn NoteStore> {
    if let Some(db_url) = &config.db_url {
        match PgNoteStore::connect(db_url).await {
            Ok(store) => {
                info!("Database initialized successfully");
                return Arc::new(store);
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
            }
        }
    } else {
        warn!("No database URL configured");
    }
    warn!("Falling back to the in-memory note store");
    Arc::new(MemoryNoteStore::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, closing connections");
}
