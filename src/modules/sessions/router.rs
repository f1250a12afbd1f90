use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_session, delete_session, get_session, get_sessions, set_session_programs,
    update_session, update_session_status,
};

pub fn init_sessions_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session).get(get_sessions))
        .route(
            "/{id}",
            get(get_session).put(update_session).delete(delete_session),
        )
        .route("/{id}/status", post(update_session_status))
        .route("/{id}/programs", put(set_session_programs))
}
