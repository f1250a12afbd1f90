use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::ProgramId;
use uuid::Uuid;

use crate::middleware::auth::{
    RequireProgramsCreate, RequireProgramsDelete, RequireProgramsRead, RequireProgramsUpdate,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::{organization_for_scoped_operation, resource_scope};
use crate::validator::ValidatedJson;

use super::model::{
    CreateProgramDto, PaginatedProgramsResponse, Program, ProgramFilterParams, UpdateProgramDto,
};
use super::service::ProgramService;

#[utoipa::path(
    post,
    path = "/api/programs",
    request_body = CreateProgramDto,
    responses(
        (status = 201, description = "Program created", body = Program),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_program(
    State(state): State<AppState>,
    RequireProgramsCreate(auth_user): RequireProgramsCreate,
    ValidatedJson(dto): ValidatedJson<CreateProgramDto>,
) -> Result<(StatusCode, Json<Program>), AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, dto.organization_id)?;
    let program = ProgramService::create_program(&state.db, organization_id, dto).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

#[utoipa::path(
    get,
    path = "/api/programs",
    params(ProgramFilterParams),
    responses((status = 200, description = "Programs", body = PaginatedProgramsResponse)),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_programs(
    State(state): State<AppState>,
    RequireProgramsRead(auth_user): RequireProgramsRead,
    Query(filters): Query<ProgramFilterParams>,
) -> Result<Json<PaginatedProgramsResponse>, AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, filters.organization_id)?;
    let programs = ProgramService::get_programs(&state.db, organization_id, filters).await?;
    Ok(Json(programs))
}

#[utoipa::path(
    get,
    path = "/api/programs/{id}",
    params(("id" = Uuid, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Program", body = Program),
        (status = 404, description = "Program not found", body = ErrorResponse)
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_program(
    State(state): State<AppState>,
    RequireProgramsRead(auth_user): RequireProgramsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Program>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let program = ProgramService::get_program(&state.db, ProgramId::from_uuid(id), scope).await?;
    Ok(Json(program))
}

#[utoipa::path(
    put,
    path = "/api/programs/{id}",
    params(("id" = Uuid, Path, description = "Program ID")),
    request_body = UpdateProgramDto,
    responses(
        (status = 200, description = "Program updated", body = Program),
        (status = 404, description = "Program not found", body = ErrorResponse)
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_program(
    State(state): State<AppState>,
    RequireProgramsUpdate(auth_user): RequireProgramsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateProgramDto>,
) -> Result<Json<Program>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let program =
        ProgramService::update_program(&state.db, ProgramId::from_uuid(id), scope, dto).await?;
    Ok(Json(program))
}

#[utoipa::path(
    delete,
    path = "/api/programs/{id}",
    params(("id" = Uuid, Path, description = "Program ID")),
    responses(
        (status = 204, description = "Program deleted"),
        (status = 404, description = "Program not found", body = ErrorResponse)
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_program(
    State(state): State<AppState>,
    RequireProgramsDelete(auth_user): RequireProgramsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    ProgramService::delete_program(&state.db, ProgramId::from_uuid(id), scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
