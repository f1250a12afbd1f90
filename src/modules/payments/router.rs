use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    create_invoice, delete_payment, get_enrollment_payments, get_session_payments, record_payment,
};

pub fn init_payments_router() -> Router<AppState> {
    Router::new().route("/{id}", delete(delete_payment))
}

/// Routes nested under `/api/enrollments`.
pub fn init_enrollment_payments_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/payments",
            get(get_enrollment_payments).post(record_payment),
        )
        .route("/{id}/invoice", post(create_invoice))
}

/// Routes nested under `/api/sessions`.
pub fn init_session_payments_router() -> Router<AppState> {
    Router::new().route("/{id}/payments", get(get_session_payments))
}
