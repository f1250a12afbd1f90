use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::SessionId;
use uuid::Uuid;

use crate::middleware::auth::{RequireReportsExport, RequireReportsView};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::documents::naming::{content_disposition, sanitize};
use crate::state::AppState;
use crate::utils::auth_helpers::{organization_for_scoped_operation, resource_scope};

use super::model::{DashboardParams, DashboardReport, SessionReport};
use super::service::ReportService;

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/report",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session report", body = SessionReport),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_report(
    State(state): State<AppState>,
    RequireReportsView(auth_user): RequireReportsView,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionReport>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let report =
        ReportService::build_session_report(&state.db, SessionId::from_uuid(id), scope).await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/report.csv",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Per-learner rows as CSV", content_type = "text/csv"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn export_session_report(
    State(state): State<AppState>,
    RequireReportsExport(auth_user): RequireReportsExport,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let scope = resource_scope(&auth_user)?;
    let (session_name, bytes) =
        ReportService::export_session_csv(&state.db, SessionId::from_uuid(id), scope).await?;

    let file_name = format!("rapport_{}.csv", sanitize(&session_name));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&file_name)),
        ],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/reports/dashboard",
    params(DashboardParams),
    responses(
        (status = 200, description = "Organization overview", body = DashboardReport),
        (status = 400, description = "System admin without organization_id", body = ErrorResponse)
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    RequireReportsView(auth_user): RequireReportsView,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardReport>, AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, params.organization_id)?;
    let report = ReportService::get_dashboard(&state.db, organization_id).await?;
    Ok(Json(report))
}
