use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::{DocumentJobId, EnrollmentId, SessionId};
use uuid::Uuid;

use crate::middleware::auth::{RequireDocumentsGenerate, RequireDocumentsSend};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::resource_scope;
use crate::validator::ValidatedJson;

use super::jobs::DocumentJobService;
use super::model::{
    BulkDocumentsDto, DocumentJobKind, DocumentJobResponse, DocumentKind, DocumentQuery,
    EmailSentResponse, RenderedDocument, SendEmailsDto,
};
use super::naming::content_disposition;
use super::service::DocumentService;

fn parse_kind(kind: &str) -> Result<DocumentKind, AppError> {
    kind.parse::<DocumentKind>()
        .map_err(|e| AppError::bad_request(anyhow::anyhow!(e)))
}

fn file_response(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(file_name)),
        ],
        bytes,
    )
        .into_response()
}

impl IntoResponse for RenderedDocument {
    fn into_response(self) -> Response {
        file_response(self.content_type, &self.file_name, self.bytes)
    }
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/documents/{kind}",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("kind" = String, Path, description = "convention, program, terms, privacy_policy or session_report"),
        DocumentQuery
    ),
    responses(
        (status = 200, description = "Rendered document", content_type = "application/pdf"),
        (status = 400, description = "Unknown or per-enrollment kind", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_document(
    State(state): State<AppState>,
    RequireDocumentsGenerate(auth_user): RequireDocumentsGenerate,
    Path((id, kind)): Path<(Uuid, String)>,
    Query(query): Query<DocumentQuery>,
) -> Result<RenderedDocument, AppError> {
    let scope = resource_scope(&auth_user)?;
    let kind = parse_kind(&kind)?;
    DocumentService::session_document(&state.db, SessionId::from_uuid(id), scope, kind, &query)
        .await
}

#[utoipa::path(
    get,
    path = "/api/enrollments/{id}/documents/{kind}",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID"),
        ("kind" = String, Path, description = "contract, convocation or attendance_certificate"),
        DocumentQuery
    ),
    responses(
        (status = 200, description = "Rendered document", content_type = "application/pdf"),
        (status = 400, description = "Unknown or session-level kind", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollment_document(
    State(state): State<AppState>,
    RequireDocumentsGenerate(auth_user): RequireDocumentsGenerate,
    Path((id, kind)): Path<(Uuid, String)>,
    Query(query): Query<DocumentQuery>,
) -> Result<RenderedDocument, AppError> {
    let scope = resource_scope(&auth_user)?;
    let kind = parse_kind(&kind)?;
    DocumentService::enrollment_document(
        &state.db,
        EnrollmentId::from_uuid(id),
        scope,
        kind,
        &query,
    )
    .await
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/documents/bulk",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = BulkDocumentsDto,
    responses(
        (status = 202, description = "Archive job queued", body = DocumentJobResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_bulk_job(
    State(state): State<AppState>,
    RequireDocumentsGenerate(auth_user): RequireDocumentsGenerate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<BulkDocumentsDto>,
) -> Result<(StatusCode, Json<DocumentJobResponse>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let job = DocumentJobService::start_job(
        &state,
        SessionId::from_uuid(id),
        scope,
        auth_user.user_id().ok(),
        dto.kind.into(),
        dto.language,
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/send-convocations",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = SendEmailsDto,
    responses(
        (status = 202, description = "Email job queued", body = DocumentJobResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn send_session_convocations(
    State(state): State<AppState>,
    RequireDocumentsSend(auth_user): RequireDocumentsSend,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SendEmailsDto>,
) -> Result<(StatusCode, Json<DocumentJobResponse>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let job = DocumentJobService::start_job(
        &state,
        SessionId::from_uuid(id),
        scope,
        auth_user.user_id().ok(),
        DocumentJobKind::ConvocationEmails,
        dto.language,
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/document-jobs",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Jobs of the session, newest first", body = Vec<DocumentJobResponse>),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_jobs(
    State(state): State<AppState>,
    RequireDocumentsGenerate(auth_user): RequireDocumentsGenerate,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DocumentJobResponse>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let jobs =
        DocumentJobService::get_session_jobs(&state.db, SessionId::from_uuid(id), scope).await?;
    Ok(Json(jobs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/document-jobs/{id}",
    params(("id" = Uuid, Path, description = "Document job ID")),
    responses(
        (status = 200, description = "Job status and progress", body = DocumentJobResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    RequireDocumentsGenerate(auth_user): RequireDocumentsGenerate,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentJobResponse>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let job = DocumentJobService::get_job(&state.db, DocumentJobId::from_uuid(id), scope).await?;
    Ok(Json(job.into()))
}

#[utoipa::path(
    get,
    path = "/api/document-jobs/{id}/download",
    params(("id" = Uuid, Path, description = "Document job ID")),
    responses(
        (status = 200, description = "ZIP archive", content_type = "application/zip"),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 409, description = "Archive not ready", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn download_job_archive(
    State(state): State<AppState>,
    RequireDocumentsGenerate(auth_user): RequireDocumentsGenerate,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let scope = resource_scope(&auth_user)?;
    let (file_name, bytes) =
        DocumentJobService::download(&state, DocumentJobId::from_uuid(id), scope).await?;
    Ok(file_response("application/zip", &file_name, bytes))
}

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/send-convocation",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = SendEmailsDto,
    responses(
        (status = 200, description = "Convocation emailed", body = EmailSentResponse),
        (status = 400, description = "Student has no email", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn send_convocation(
    State(state): State<AppState>,
    RequireDocumentsSend(auth_user): RequireDocumentsSend,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SendEmailsDto>,
) -> Result<Json<EmailSentResponse>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let sent = DocumentService::send_convocation(
        &state.db,
        &state.email_config,
        EnrollmentId::from_uuid(id),
        scope,
        dto.language,
    )
    .await?;
    Ok(Json(sent))
}

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/send-contract",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = SendEmailsDto,
    responses(
        (status = 200, description = "Contract emailed", body = EmailSentResponse),
        (status = 400, description = "Student has no email", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn send_contract(
    State(state): State<AppState>,
    RequireDocumentsSend(auth_user): RequireDocumentsSend,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SendEmailsDto>,
) -> Result<Json<EmailSentResponse>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let sent = DocumentService::send_contract(
        &state.db,
        &state.email_config,
        EnrollmentId::from_uuid(id),
        scope,
        dto.language,
    )
    .await?;
    Ok(Json(sent))
}
