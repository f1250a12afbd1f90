use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_user, deactivate_user, get_user, get_users, update_user};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(get_users))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(deactivate_user),
        )
}
