use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_slot, delete_session_slots, delete_slot, generate_slots, get_session_slots,
    update_slot,
};

/// Routes nested under `/api/sessions`.
pub fn init_session_slots_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/slots",
            get(get_session_slots)
                .post(create_slot)
                .delete(delete_session_slots),
        )
        .route("/{id}/slots/generate", post(generate_slots))
}

pub fn init_slots_router() -> Router<AppState> {
    Router::new().route("/{id}", put(update_slot).delete(delete_slot))
}
