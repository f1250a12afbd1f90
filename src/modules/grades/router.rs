use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{create_grade, delete_grade, get_grade_stats, get_session_grades, update_grade};

pub fn init_grades_router() -> Router<AppState> {
    Router::new().route("/{id}", put(update_grade).delete(delete_grade))
}

/// Routes nested under `/api/sessions`.
pub fn init_session_grades_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/grades", get(get_session_grades).post(create_grade))
        .route("/{id}/grades/stats", get(get_grade_stats))
}
