use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::{EnrollmentId, SessionId};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireEnrollmentsCreate, RequireEnrollmentsDelete, RequireEnrollmentsRead,
    RequireEnrollmentsUpdate,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::resource_scope;
use crate::validator::ValidatedJson;

use super::model::{
    BulkEnrollDto, BulkEnrollResponse, CreateEnrollmentDto, Enrollment, EnrollmentFilterParams,
    EnrollmentWithStudent, SessionCapacity, UpdateEnrollmentDto,
};
use super::service::EnrollmentService;

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = CreateEnrollmentDto,
    responses(
        (status = 201, description = "Student enrolled", body = Enrollment),
        (status = 400, description = "Session no longer accepts enrollments", body = ErrorResponse),
        (status = 404, description = "Session or student not found", body = ErrorResponse),
        (status = 409, description = "Duplicate enrollment or session full", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsCreate(auth_user): RequireEnrollmentsCreate,
    ValidatedJson(dto): ValidatedJson<CreateEnrollmentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let enrollment =
        EnrollmentService::create_enrollment(&state.db, state.cache(), scope, dto).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/enrollments/bulk",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = BulkEnrollDto,
    responses(
        (status = 200, description = "Enrolled and rejected students", body = BulkEnrollResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn bulk_enroll(
    State(state): State<AppState>,
    RequireEnrollmentsCreate(auth_user): RequireEnrollmentsCreate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<BulkEnrollDto>,
) -> Result<Json<BulkEnrollResponse>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let response = EnrollmentService::bulk_enroll(
        &state.db,
        state.cache(),
        SessionId::from_uuid(id),
        scope,
        dto,
    )
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Session ID"), EnrollmentFilterParams),
    responses(
        (status = 200, description = "Enrollments with their student", body = Vec<EnrollmentWithStudent>),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_enrollments(
    State(state): State<AppState>,
    RequireEnrollmentsRead(auth_user): RequireEnrollmentsRead,
    Path(id): Path<Uuid>,
    Query(filters): Query<EnrollmentFilterParams>,
) -> Result<Json<Vec<EnrollmentWithStudent>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let enrollments = EnrollmentService::get_session_enrollments(
        &state.db,
        SessionId::from_uuid(id),
        scope,
        filters,
    )
    .await?;
    Ok(Json(enrollments))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/capacity",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Seats taken and left", body = SessionCapacity),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_capacity(
    State(state): State<AppState>,
    RequireEnrollmentsRead(auth_user): RequireEnrollmentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionCapacity>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let capacity =
        EnrollmentService::get_session_capacity(&state.db, SessionId::from_uuid(id), scope).await?;
    Ok(Json(capacity))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment with its student", body = EnrollmentWithStudent),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsRead(auth_user): RequireEnrollmentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentWithStudent>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let enrollment =
        EnrollmentService::get_enrollment(&state.db, EnrollmentId::from_uuid(id), scope).await?;
    Ok(Json(enrollment))
}

#[utoipa::path(
    put,
    path = "/api/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = UpdateEnrollmentDto,
    responses(
        (status = 200, description = "Enrollment updated", body = Enrollment),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 409, description = "Session full", body = ErrorResponse),
        (status = 422, description = "Paid amount exceeds total", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsUpdate(auth_user): RequireEnrollmentsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateEnrollmentDto>,
) -> Result<Json<Enrollment>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let enrollment = EnrollmentService::update_enrollment(
        &state.db,
        state.cache(),
        EnrollmentId::from_uuid(id),
        scope,
        dto,
    )
    .await?;
    Ok(Json(enrollment))
}

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment cancelled", body = Enrollment),
        (status = 400, description = "Session completed or enrollment invoiced", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsUpdate(auth_user): RequireEnrollmentsUpdate,
    Path(id): Path<Uuid>,
) -> Result<Json<Enrollment>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let enrollment = EnrollmentService::cancel_enrollment(
        &state.db,
        state.cache(),
        EnrollmentId::from_uuid(id),
        scope,
    )
    .await?;
    Ok(Json(enrollment))
}

#[utoipa::path(
    delete,
    path = "/api/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 204, description = "Enrollment deleted"),
        (status = 400, description = "Enrollment has payments", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsDelete(auth_user): RequireEnrollmentsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    EnrollmentService::delete_enrollment(
        &state.db,
        state.cache(),
        EnrollmentId::from_uuid(id),
        scope,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
