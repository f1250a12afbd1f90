use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    complete_lesson, create_course, create_lesson, delete_course, delete_lesson, get_course,
    get_courses, get_session_courses, get_session_progress, link_course, record_quiz_attempt,
    track_progress, unlink_course, update_course,
};

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course).get(get_courses))
        .route(
            "/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/{id}/lessons", post(create_lesson))
        .route("/{id}/lessons/{lesson_id}", delete(delete_lesson))
}

pub fn init_elearning_router() -> Router<AppState> {
    Router::new()
        .route("/progress", post(track_progress))
        .route("/progress/complete", post(complete_lesson))
        .route("/quiz-attempts", post(record_quiz_attempt))
}

/// Routes nested under `/api/sessions`.
pub fn init_session_elearning_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/courses", get(get_session_courses).post(link_course))
        .route("/{id}/courses/{course_id}", delete(unlink_course))
        .route("/{id}/elearning/progress", get(get_session_progress))
}
