use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::{SessionId, SlotId};
use uuid::Uuid;

use crate::middleware::auth::{RequireSlotsManage, RequireSlotsRead};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::resource_scope;
use crate::validator::ValidatedJson;

use super::model::{
    CreateSlotDto, DeleteSlotsResponse, GenerateSlotsDto, GenerateSlotsResponse, SessionSlot,
    UpdateSlotDto,
};
use super::service::SlotService;

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/slots",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Slots ordered by date and start time", body = Vec<SessionSlot>),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_slots(
    State(state): State<AppState>,
    RequireSlotsRead(auth_user): RequireSlotsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SessionSlot>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let slots = SlotService::get_session_slots(&state.db, SessionId::from_uuid(id), scope).await?;
    Ok(Json(slots))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/slots/generate",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = GenerateSlotsDto,
    responses(
        (status = 201, description = "Slots generated", body = GenerateSlotsResponse),
        (status = 400, description = "Invalid template or empty range", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn generate_slots(
    State(state): State<AppState>,
    RequireSlotsManage(auth_user): RequireSlotsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<GenerateSlotsDto>,
) -> Result<(StatusCode, Json<GenerateSlotsResponse>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let response = SlotService::generate_slots(
        &state.db,
        state.cache(),
        SessionId::from_uuid(id),
        scope,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/slots",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = CreateSlotDto,
    responses(
        (status = 201, description = "Slot created", body = SessionSlot),
        (status = 400, description = "Slot outside the session or unordered times", body = ErrorResponse),
        (status = 409, description = "Slot already exists", body = ErrorResponse)
    ),
    tag = "Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_slot(
    State(state): State<AppState>,
    RequireSlotsManage(auth_user): RequireSlotsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateSlotDto>,
) -> Result<(StatusCode, Json<SessionSlot>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let slot =
        SlotService::create_slot(&state.db, state.cache(), SessionId::from_uuid(id), scope, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}/slots",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "All slots of the session deleted", body = DeleteSlotsResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_session_slots(
    State(state): State<AppState>,
    RequireSlotsManage(auth_user): RequireSlotsManage,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteSlotsResponse>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let response =
        SlotService::delete_session_slots(&state.db, state.cache(), SessionId::from_uuid(id), scope)
            .await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/slots/{id}",
    params(("id" = Uuid, Path, description = "Slot ID")),
    request_body = UpdateSlotDto,
    responses(
        (status = 200, description = "Slot updated", body = SessionSlot),
        (status = 404, description = "Slot not found", body = ErrorResponse),
        (status = 409, description = "Slot already exists", body = ErrorResponse)
    ),
    tag = "Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_slot(
    State(state): State<AppState>,
    RequireSlotsManage(auth_user): RequireSlotsManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSlotDto>,
) -> Result<Json<SessionSlot>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let slot =
        SlotService::update_slot(&state.db, state.cache(), SlotId::from_uuid(id), scope, dto)
            .await?;
    Ok(Json(slot))
}

#[utoipa::path(
    delete,
    path = "/api/slots/{id}",
    params(("id" = Uuid, Path, description = "Slot ID")),
    responses(
        (status = 204, description = "Slot deleted"),
        (status = 404, description = "Slot not found", body = ErrorResponse)
    ),
    tag = "Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_slot(
    State(state): State<AppState>,
    RequireSlotsManage(auth_user): RequireSlotsManage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    SlotService::delete_slot(&state.db, state.cache(), SlotId::from_uuid(id), scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
