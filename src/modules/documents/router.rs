use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_bulk_job, download_job_archive, get_enrollment_document, get_job, get_session_document,
    get_session_jobs, send_contract, send_convocation, send_session_convocations,
};

pub fn init_document_jobs_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_job))
        .route("/{id}/download", get(download_job_archive))
}

/// Routes nested under `/api/sessions`.
pub fn init_session_documents_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/documents/bulk", post(create_bulk_job))
        .route("/{id}/documents/{kind}", get(get_session_document))
        .route("/{id}/document-jobs", get(get_session_jobs))
        .route("/{id}/send-convocations", post(send_session_convocations))
}

/// Routes nested under `/api/enrollments`.
pub fn init_enrollment_documents_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/documents/{kind}", get(get_enrollment_document))
        .route("/{id}/send-convocation", post(send_convocation))
        .route("/{id}/send-contract", post(send_contract))
}
