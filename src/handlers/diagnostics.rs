use crate::{models::DiagnosticsResponse, AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Session layer and host statistics
pub async fn diagnostics(
    State(app_state): State<Arc<AppState>>,
) -> (StatusCode, Json<DiagnosticsResponse>) {
    let hub = &app_state.hub;
    let n_conn = hub.broadcaster().connection_count() as u32;
    let n_rooms = hub.registry().room_count() as u32;
    let coord = hub.coordinator().stats();

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB, Conn: {}, Rooms: {}, Pending saves: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        n_conn,
        n_rooms,
        coord.pending_saves
    );

    (
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn,
            n_rooms,
            n_doc_slots: coord.slots as u32,
            n_pending_saves: coord.pending_saves as u32,
            n_saves_ok: coord.saves_ok,
            n_saves_failed: coord.saves_failed,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    )
}
