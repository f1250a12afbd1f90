use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::{GradeId, SessionId};
use uuid::Uuid;

use crate::middleware::auth::{RequireGradesManage, RequireGradesRead};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::resource_scope;
use crate::validator::ValidatedJson;

use super::model::{CreateGradeDto, Grade, GradeFilterParams, GradeStats, UpdateGradeDto};
use super::service::GradeService;

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/grades",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = CreateGradeDto,
    responses(
        (status = 201, description = "Grade recorded", body = Grade),
        (status = 400, description = "Learner not enrolled", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_grade(
    State(state): State<AppState>,
    RequireGradesManage(auth_user): RequireGradesManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateGradeDto>,
) -> Result<(StatusCode, Json<Grade>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let grader = auth_user.user_id().ok();
    let grade =
        GradeService::create_grade(&state.db, SessionId::from_uuid(id), scope, grader, dto).await?;
    Ok((StatusCode::CREATED, Json(grade)))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/grades",
    params(("id" = Uuid, Path, description = "Session ID"), GradeFilterParams),
    responses(
        (status = 200, description = "Grades, newest first", body = Vec<Grade>),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_grades(
    State(state): State<AppState>,
    RequireGradesRead(auth_user): RequireGradesRead,
    Path(id): Path<Uuid>,
    Query(filters): Query<GradeFilterParams>,
) -> Result<Json<Vec<Grade>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let grades =
        GradeService::get_session_grades(&state.db, SessionId::from_uuid(id), scope, &filters)
            .await?;
    Ok(Json(grades))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/grades/stats",
    params(("id" = Uuid, Path, description = "Session ID"), GradeFilterParams),
    responses(
        (status = 200, description = "Grade averages", body = GradeStats),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_grade_stats(
    State(state): State<AppState>,
    RequireGradesRead(auth_user): RequireGradesRead,
    Path(id): Path<Uuid>,
    Query(filters): Query<GradeFilterParams>,
) -> Result<Json<GradeStats>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let stats =
        GradeService::get_stats(&state.db, SessionId::from_uuid(id), scope, &filters).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    put,
    path = "/api/grades/{id}",
    params(("id" = Uuid, Path, description = "Grade ID")),
    request_body = UpdateGradeDto,
    responses(
        (status = 200, description = "Grade updated", body = Grade),
        (status = 404, description = "Grade not found", body = ErrorResponse),
        (status = 422, description = "Score exceeds maximum", body = ErrorResponse)
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_grade(
    State(state): State<AppState>,
    RequireGradesManage(auth_user): RequireGradesManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateGradeDto>,
) -> Result<Json<Grade>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let grade = GradeService::update_grade(&state.db, GradeId::from_uuid(id), scope, dto).await?;
    Ok(Json(grade))
}

#[utoipa::path(
    delete,
    path = "/api/grades/{id}",
    params(("id" = Uuid, Path, description = "Grade ID")),
    responses(
        (status = 204, description = "Grade deleted"),
        (status = 404, description = "Grade not found", body = ErrorResponse)
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_grade(
    State(state): State<AppState>,
    RequireGradesManage(auth_user): RequireGradesManage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    GradeService::delete_grade(&state.db, GradeId::from_uuid(id), scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
