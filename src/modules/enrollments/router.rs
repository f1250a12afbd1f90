use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    bulk_enroll, cancel_enrollment, create_enrollment, delete_enrollment, get_enrollment,
    get_session_capacity, get_session_enrollments, update_enrollment,
};

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_enrollment))
        .route(
            "/{id}",
            get(get_enrollment)
                .put(update_enrollment)
                .delete(delete_enrollment),
        )
        .route("/{id}/cancel", post(cancel_enrollment))
}

/// Routes nested under `/api/sessions`.
pub fn init_session_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/enrollments", get(get_session_enrollments))
        .route("/{id}/enrollments/bulk", post(bulk_enroll))
        .route("/{id}/capacity", get(get_session_capacity))
}
