use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    cancel_request, create_bulk_requests, create_request, decline_document, download_document,
    get_enrollment_requests, get_public_request, get_request, list_requests, send_reminder,
    sign_document,
};

pub fn init_signature_requests_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests))
        .route("/{id}", get(get_request))
        .route("/{id}/cancel", post(cancel_request))
        .route("/{id}/remind", post(send_reminder))
}

/// Unauthenticated routes reached through the emailed link.
pub fn init_public_signatures_router() -> Router<AppState> {
    Router::new()
        .route("/{token}", get(get_public_request))
        .route("/{token}/document", get(download_document))
        .route("/{token}/sign", post(sign_document))
        .route("/{token}/decline", post(decline_document))
}

/// Routes nested under `/api/sessions`.
pub fn init_session_signatures_router() -> Router<AppState> {
    Router::new().route("/{id}/signature-requests/bulk", post(create_bulk_requests))
}

/// Routes nested under `/api/enrollments`.
pub fn init_enrollment_signatures_router() -> Router<AppState> {
    Router::new().route(
        "/{id}/signature-requests",
        get(get_enrollment_requests).post(create_request),
    )
}
