use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::FormationId;
use uuid::Uuid;

use crate::middleware::auth::{
    RequireFormationsCreate, RequireFormationsDelete, RequireFormationsRead,
    RequireFormationsUpdate,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::{organization_for_scoped_operation, resource_scope};
use crate::validator::ValidatedJson;

use super::model::{
    CreateFormationDto, Formation, FormationFilterParams, PaginatedFormationsResponse,
    UpdateFormationDto,
};
use super::service::FormationService;

#[utoipa::path(
    post,
    path = "/api/formations",
    request_body = CreateFormationDto,
    responses(
        (status = 201, description = "Formation created", body = Formation),
        (status = 409, description = "Code already used", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Formations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_formation(
    State(state): State<AppState>,
    RequireFormationsCreate(auth_user): RequireFormationsCreate,
    ValidatedJson(dto): ValidatedJson<CreateFormationDto>,
) -> Result<(StatusCode, Json<Formation>), AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, dto.organization_id)?;
    let formation =
        FormationService::create_formation(&state.db, state.cache(), organization_id, dto).await?;
    Ok((StatusCode::CREATED, Json(formation)))
}

#[utoipa::path(
    get,
    path = "/api/formations",
    params(FormationFilterParams),
    responses(
        (status = 200, description = "Formations", body = PaginatedFormationsResponse)
    ),
    tag = "Formations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_formations(
    State(state): State<AppState>,
    RequireFormationsRead(auth_user): RequireFormationsRead,
    Query(filters): Query<FormationFilterParams>,
) -> Result<Json<PaginatedFormationsResponse>, AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, filters.organization_id)?;
    let formations =
        FormationService::get_formations(&state.db, state.cache(), organization_id, filters)
            .await?;
    Ok(Json(formations))
}

#[utoipa::path(
    get,
    path = "/api/formations/{id}",
    params(("id" = Uuid, Path, description = "Formation ID")),
    responses(
        (status = 200, description = "Formation", body = Formation),
        (status = 404, description = "Formation not found", body = ErrorResponse)
    ),
    tag = "Formations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_formation(
    State(state): State<AppState>,
    RequireFormationsRead(auth_user): RequireFormationsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Formation>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let formation =
        FormationService::get_formation(&state.db, state.cache(), FormationId::from_uuid(id), scope)
            .await?;
    Ok(Json(formation))
}

#[utoipa::path(
    put,
    path = "/api/formations/{id}",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = UpdateFormationDto,
    responses(
        (status = 200, description = "Formation updated", body = Formation),
        (status = 404, description = "Formation not found", body = ErrorResponse),
        (status = 409, description = "Code already used", body = ErrorResponse)
    ),
    tag = "Formations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_formation(
    State(state): State<AppState>,
    RequireFormationsUpdate(auth_user): RequireFormationsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateFormationDto>,
) -> Result<Json<Formation>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let formation = FormationService::update_formation(
        &state.db,
        state.cache(),
        FormationId::from_uuid(id),
        scope,
        dto,
    )
    .await?;
    Ok(Json(formation))
}

#[utoipa::path(
    delete,
    path = "/api/formations/{id}",
    params(("id" = Uuid, Path, description = "Formation ID")),
    responses(
        (status = 204, description = "Formation deleted"),
        (status = 400, description = "Formation is used by sessions", body = ErrorResponse),
        (status = 404, description = "Formation not found", body = ErrorResponse)
    ),
    tag = "Formations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_formation(
    State(state): State<AppState>,
    RequireFormationsDelete(auth_user): RequireFormationsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    FormationService::delete_formation(&state.db, state.cache(), FormationId::from_uuid(id), scope)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
