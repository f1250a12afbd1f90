use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::StudentId;
use uuid::Uuid;

use crate::middleware::auth::{
    RequireStudentsCreate, RequireStudentsDelete, RequireStudentsRead, RequireStudentsUpdate,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::{organization_for_scoped_operation, resource_scope};
use crate::validator::ValidatedJson;

use super::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};
use super::service::StudentService;

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 409, description = "Email already used in this organization", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_student(
    State(state): State<AppState>,
    RequireStudentsCreate(auth_user): RequireStudentsCreate,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, dto.organization_id)?;
    let student = StudentService::create_student(&state.db, organization_id, dto).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentFilterParams),
    responses(
        (status = 200, description = "Students", body = PaginatedStudentsResponse),
        (status = 400, description = "System admin without organization_id", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_students(
    State(state): State<AppState>,
    RequireStudentsRead(auth_user): RequireStudentsRead,
    Query(filters): Query<StudentFilterParams>,
) -> Result<Json<PaginatedStudentsResponse>, AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, filters.organization_id)?;
    let students = StudentService::get_students(&state.db, organization_id, filters).await?;
    Ok(Json(students))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    RequireStudentsRead(auth_user): RequireStudentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Student>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let student = StudentService::get_student(&state.db, StudentId::from_uuid(id), scope).await?;
    Ok(Json(student))
}

#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 409, description = "Email already used in this organization", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_student(
    State(state): State<AppState>,
    RequireStudentsUpdate(auth_user): RequireStudentsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<Student>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let student =
        StudentService::update_student(&state.db, StudentId::from_uuid(id), scope, dto).await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 400, description = "Student has enrollments", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    RequireStudentsDelete(auth_user): RequireStudentsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    StudentService::delete_student(&state.db, StudentId::from_uuid(id), scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
