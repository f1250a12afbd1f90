use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::SessionId;
use uuid::Uuid;

use crate::middleware::auth::{
    RequireSessionsCreate, RequireSessionsDelete, RequireSessionsRead, RequireSessionsUpdate,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::{organization_for_scoped_operation, resource_scope};
use crate::validator::ValidatedJson;

use super::model::{
    CreateSessionDto, PaginatedSessionsResponse, Session, SessionDetail, SessionFilterParams,
    SetSessionProgramsDto, UpdateSessionDto, UpdateSessionStatusDto,
};
use super::service::SessionService;

#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionDto,
    responses(
        (status = 201, description = "Session created", body = SessionDetail),
        (status = 400, description = "Invalid dates or staff", body = ErrorResponse),
        (status = 404, description = "Formation or program not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_session(
    State(state): State<AppState>,
    RequireSessionsCreate(auth_user): RequireSessionsCreate,
    ValidatedJson(dto): ValidatedJson<CreateSessionDto>,
) -> Result<(StatusCode, Json<SessionDetail>), AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, dto.organization_id)?;
    let session =
        SessionService::create_session(&state.db, state.cache(), organization_id, dto).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/sessions",
    params(SessionFilterParams),
    responses((status = 200, description = "Sessions with enrollment counts", body = PaginatedSessionsResponse)),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_sessions(
    State(state): State<AppState>,
    RequireSessionsRead(auth_user): RequireSessionsRead,
    Query(filters): Query<SessionFilterParams>,
) -> Result<Json<PaginatedSessionsResponse>, AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, filters.organization_id)?;
    let sessions =
        SessionService::get_sessions(&state.db, state.cache(), organization_id, filters).await?;
    Ok(Json(sessions))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session details", body = SessionDetail),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    RequireSessionsRead(auth_user): RequireSessionsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let session =
        SessionService::get_session(&state.db, state.cache(), SessionId::from_uuid(id), scope)
            .await?;
    Ok(Json(session))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = UpdateSessionDto,
    responses(
        (status = 200, description = "Session updated", body = SessionDetail),
        (status = 400, description = "Invalid dates, staff or capacity", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_session(
    State(state): State<AppState>,
    RequireSessionsUpdate(auth_user): RequireSessionsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSessionDto>,
) -> Result<Json<SessionDetail>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let session = SessionService::update_session(
        &state.db,
        state.cache(),
        SessionId::from_uuid(id),
        scope,
        dto,
    )
    .await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/status",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = UpdateSessionStatusDto,
    responses(
        (status = 200, description = "Status updated", body = Session),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_session_status(
    State(state): State<AppState>,
    RequireSessionsUpdate(auth_user): RequireSessionsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSessionStatusDto>,
) -> Result<Json<Session>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let session = SessionService::update_status(
        &state.db,
        state.cache(),
        SessionId::from_uuid(id),
        scope,
        dto.status,
    )
    .await?;
    Ok(Json(session))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}/programs",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = SetSessionProgramsDto,
    responses(
        (status = 200, description = "Program links replaced", body = SessionDetail),
        (status = 404, description = "Session or program not found", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn set_session_programs(
    State(state): State<AppState>,
    RequireSessionsUpdate(auth_user): RequireSessionsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SetSessionProgramsDto>,
) -> Result<Json<SessionDetail>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let session = SessionService::set_programs(
        &state.db,
        state.cache(),
        SessionId::from_uuid(id),
        scope,
        dto.program_ids,
    )
    .await?;
    Ok(Json(session))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 400, description = "Session has payments", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_session(
    State(state): State<AppState>,
    RequireSessionsDelete(auth_user): RequireSessionsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    SessionService::delete_session(&state.db, state.cache(), SessionId::from_uuid(id), scope)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
