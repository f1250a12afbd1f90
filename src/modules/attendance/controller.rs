use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::{SessionId, SlotId};
use uuid::Uuid;

use crate::middleware::auth::{RequireAttendanceRead, RequireAttendanceRecord};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::resource_scope;
use crate::validator::ValidatedJson;

use super::model::{
    AttendanceEntry, AttendanceFilterParams, AttendanceRecord, AttendanceStats,
    RecordAttendanceDto,
};
use super::service::AttendanceService;

#[utoipa::path(
    post,
    path = "/api/slots/{id}/attendance",
    params(("id" = Uuid, Path, description = "Slot ID")),
    request_body = RecordAttendanceDto,
    responses(
        (status = 200, description = "Attendance recorded", body = Vec<AttendanceRecord>),
        (status = 400, description = "Learner not enrolled in the session", body = ErrorResponse),
        (status = 404, description = "Slot not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn record_attendance(
    State(state): State<AppState>,
    RequireAttendanceRecord(auth_user): RequireAttendanceRecord,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<RecordAttendanceDto>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let recorded_by = auth_user.user_id().ok();
    let records = AttendanceService::record_attendance(
        &state.db,
        SlotId::from_uuid(id),
        scope,
        recorded_by,
        dto,
    )
    .await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/slots/{id}/attendance",
    params(("id" = Uuid, Path, description = "Slot ID")),
    responses(
        (status = 200, description = "Attendance of the slot", body = Vec<AttendanceEntry>),
        (status = 404, description = "Slot not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_slot_attendance(
    State(state): State<AppState>,
    RequireAttendanceRead(auth_user): RequireAttendanceRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttendanceEntry>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let entries =
        AttendanceService::get_slot_attendance(&state.db, SlotId::from_uuid(id), scope).await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/attendance",
    params(("id" = Uuid, Path, description = "Session ID"), AttendanceFilterParams),
    responses(
        (status = 200, description = "Attendance of the session", body = Vec<AttendanceEntry>),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_attendance(
    State(state): State<AppState>,
    RequireAttendanceRead(auth_user): RequireAttendanceRead,
    Path(id): Path<Uuid>,
    Query(filters): Query<AttendanceFilterParams>,
) -> Result<Json<Vec<AttendanceEntry>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let entries = AttendanceService::get_session_attendance(
        &state.db,
        SessionId::from_uuid(id),
        scope,
        filters,
    )
    .await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/attendance/stats",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Attendance totals and rates", body = AttendanceStats),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_attendance_stats(
    State(state): State<AppState>,
    RequireAttendanceRead(auth_user): RequireAttendanceRead,
    Path(id): Path<Uuid>,
) -> Result<Json<AttendanceStats>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let stats = AttendanceService::get_stats(&state.db, SessionId::from_uuid(id), scope).await?;
    Ok(Json(stats))
}
