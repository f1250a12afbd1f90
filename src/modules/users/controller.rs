use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::UserId;
use uuid::Uuid;

use crate::middleware::auth::{RequireUsersCreate, RequireUsersDelete, RequireUsersRead, RequireUsersUpdate};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::{organization_for_scoped_operation, resource_scope};
use crate::validator::ValidatedJson;

use super::model::{CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserFilterParams, UserRole};
use super::service::UserService;

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Missing organization", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_user(
    State(state): State<AppState>,
    RequireUsersCreate(auth_user): RequireUsersCreate,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let organization_id = if dto.role == UserRole::SystemAdmin {
        if !auth_user.is_system_admin() {
            return Err(AppError::forbidden(
                "Only system admins can create system admin accounts".to_string(),
            ));
        }
        None
    } else {
        Some(organization_for_scoped_operation(&auth_user, dto.organization_id)?)
    };

    let user = UserService::create_user(&state.db, organization_id, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserFilterParams),
    responses(
        (status = 200, description = "Users", body = PaginatedUsersResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    RequireUsersRead(auth_user): RequireUsersRead,
    Query(filters): Query<UserFilterParams>,
) -> Result<Json<PaginatedUsersResponse>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let users = UserService::get_users(&state.db, scope, filters).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireUsersRead(auth_user): RequireUsersRead,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let user = UserService::get_user(&state.db, UserId::from_uuid(id), scope).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireUsersUpdate(auth_user): RequireUsersUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<User>, AppError> {
    if dto.role == Some(UserRole::SystemAdmin) && !auth_user.is_system_admin() {
        return Err(AppError::forbidden(
            "Only system admins can grant the system admin role".to_string(),
        ));
    }

    let scope = resource_scope(&auth_user)?;
    let user = UserService::update_user(&state.db, UserId::from_uuid(id), scope, dto).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 400, description = "Cannot deactivate yourself", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireUsersDelete(auth_user): RequireUsersDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let id = UserId::from_uuid(id);
    if auth_user.user_id()? == id {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "You cannot deactivate your own account"
        )));
    }

    let scope = resource_scope(&auth_user)?;
    UserService::deactivate_user(&state.db, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
