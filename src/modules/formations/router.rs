use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_formation, delete_formation, get_formation, get_formations, update_formation,
};

pub fn init_formations_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_formation).get(get_formations))
        .route(
            "/{id}",
            get(get_formation)
                .put(update_formation)
                .delete(delete_formation),
        )
}
