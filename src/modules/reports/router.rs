use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{export_session_report, get_dashboard, get_session_report};

pub fn init_reports_router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// Routes nested under `/api/sessions`.
pub fn init_session_reports_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/report", get(get_session_report))
        .route("/{id}/report.csv", get(export_session_report))
}
