use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::OrganizationId;
use uuid::Uuid;

use crate::middleware::auth::{
    RequireOrganizationsCreate, RequireOrganizationsDelete, RequireOrganizationsRead,
    RequireOrganizationsUpdate,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::{ensure_in_scope, resource_scope};
use crate::validator::ValidatedJson;

use super::model::{
    CreateOrganizationDto, Organization, OrganizationFilterParams,
    PaginatedOrganizationsResponse, UpdateOrganizationDto,
};
use super::service::OrganizationService;

#[utoipa::path(
    post,
    path = "/api/organizations",
    request_body = CreateOrganizationDto,
    responses(
        (status = 201, description = "Organization created", body = Organization),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_organization(
    State(state): State<AppState>,
    RequireOrganizationsCreate(_auth_user): RequireOrganizationsCreate,
    ValidatedJson(dto): ValidatedJson<CreateOrganizationDto>,
) -> Result<(StatusCode, Json<Organization>), AppError> {
    let organization = OrganizationService::create_organization(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

#[utoipa::path(
    get,
    path = "/api/organizations",
    params(OrganizationFilterParams),
    responses(
        (status = 200, description = "Organizations visible to the caller", body = PaginatedOrganizationsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_organizations(
    State(state): State<AppState>,
    RequireOrganizationsRead(auth_user): RequireOrganizationsRead,
    Query(filters): Query<OrganizationFilterParams>,
) -> Result<Json<PaginatedOrganizationsResponse>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let organizations = OrganizationService::get_organizations(&state.db, scope, filters).await?;
    Ok(Json(organizations))
}

#[utoipa::path(
    get,
    path = "/api/organizations/{id}",
    params(("id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization details", body = Organization),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_organization(
    State(state): State<AppState>,
    RequireOrganizationsRead(auth_user): RequireOrganizationsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Organization>, AppError> {
    let id = OrganizationId::from_uuid(id);
    ensure_in_scope(resource_scope(&auth_user)?, id, "Organization")?;

    let organization = OrganizationService::get_organization(&state.db, id).await?;
    Ok(Json(organization))
}

#[utoipa::path(
    put,
    path = "/api/organizations/{id}",
    params(("id" = Uuid, Path, description = "Organization ID")),
    request_body = UpdateOrganizationDto,
    responses(
        (status = 200, description = "Organization updated", body = Organization),
        (status = 404, description = "Organization not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_organization(
    State(state): State<AppState>,
    RequireOrganizationsUpdate(auth_user): RequireOrganizationsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateOrganizationDto>,
) -> Result<Json<Organization>, AppError> {
    let id = OrganizationId::from_uuid(id);
    ensure_in_scope(resource_scope(&auth_user)?, id, "Organization")?;

    let organization = OrganizationService::update_organization(&state.db, id, dto).await?;
    Ok(Json(organization))
}

#[utoipa::path(
    delete,
    path = "/api/organizations/{id}",
    params(("id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 204, description = "Organization deleted"),
        (status = 400, description = "Organization still has sessions", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_organization(
    State(state): State<AppState>,
    RequireOrganizationsDelete(_auth_user): RequireOrganizationsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    OrganizationService::delete_organization(&state.db, OrganizationId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
