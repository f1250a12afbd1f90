use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::{Router, middleware};
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use trainhub_config::{CorsConfig, RateLimitConfig};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::modules::attendance::{init_session_attendance_router, init_slot_attendance_router};
use crate::modules::auth::init_auth_router;
use crate::modules::documents::{
    init_document_jobs_router, init_enrollment_documents_router, init_session_documents_router,
};
use crate::modules::elearning::{
    init_courses_router, init_elearning_router, init_session_elearning_router,
};
use crate::modules::enrollments::{init_enrollments_router, init_session_enrollments_router};
use crate::modules::formations::init_formations_router;
use crate::modules::grades::{init_grades_router, init_session_grades_router};
use crate::modules::organizations::init_organizations_router;
use crate::modules::payments::{
    init_enrollment_payments_router, init_payments_router, init_session_payments_router,
};
use crate::modules::programs::init_programs_router;
use crate::modules::reports::{init_reports_router, init_session_reports_router};
use crate::modules::sessions::init_sessions_router;
use crate::modules::signatures::{
    init_enrollment_signatures_router, init_public_signatures_router,
    init_session_signatures_router, init_signature_requests_router,
};
use crate::modules::slots::{init_session_slots_router, init_slots_router};
use crate::modules::students::init_students_router;
use crate::modules::users::init_users_router;
use crate::state::AppState;

pub fn init_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_router(&state.rate_limit_config))
        .nest("/users", init_users_router())
        .nest("/organizations", init_organizations_router())
        .nest("/students", init_students_router())
        .nest("/formations", init_formations_router())
        .nest("/programs", init_programs_router())
        .nest(
            "/sessions",
            init_sessions_router()
                .merge(init_session_slots_router())
                .merge(init_session_enrollments_router())
                .merge(init_session_attendance_router())
                .merge(init_session_grades_router())
                .merge(init_session_payments_router())
                .merge(init_session_elearning_router())
                .merge(init_session_reports_router())
                .merge(init_session_documents_router())
                .merge(init_session_signatures_router()),
        )
        .nest(
            "/slots",
            init_slots_router().merge(init_slot_attendance_router()),
        )
        .nest(
            "/enrollments",
            init_enrollments_router()
                .merge(init_enrollment_payments_router())
                .merge(init_enrollment_documents_router())
                .merge(init_enrollment_signatures_router()),
        )
        .nest("/grades", init_grades_router())
        .nest("/payments", init_payments_router())
        .nest("/courses", init_courses_router())
        .nest("/elearning", init_elearning_router())
        .nest("/reports", init_reports_router())
        .nest("/document-jobs", init_document_jobs_router())
        .nest("/signature-requests", init_signature_requests_router())
        .nest("/signatures", init_public_signatures_router());

    let cors = cors_layer(&state.cors_config);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}

/// Authentication routes, throttled per peer IP when rate limiting is on.
fn auth_router(config: &RateLimitConfig) -> Router<AppState> {
    let router = init_auth_router();
    match config.governor_config() {
        Some(governor) => router.layer(GovernorLayer::new(Arc::new(governor))),
        None => router,
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
}
