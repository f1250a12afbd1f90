use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    get_attendance_stats, get_session_attendance, get_slot_attendance, record_attendance,
};

/// Routes nested under `/api/slots`.
pub fn init_slot_attendance_router() -> Router<AppState> {
    Router::new().route(
        "/{id}/attendance",
        get(get_slot_attendance).post(record_attendance),
    )
}

/// Routes nested under `/api/sessions`.
pub fn init_session_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/attendance", get(get_session_attendance))
        .route("/{id}/attendance/stats", get(get_attendance_stats))
}
