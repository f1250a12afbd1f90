use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::{EnrollmentId, SessionId, SignatureRequestId};
use uuid::Uuid;

use crate::middleware::auth::{RequireSignaturesRead, RequireSignaturesSend};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::documents::model::RenderedDocument;
use crate::state::AppState;
use crate::utils::auth_helpers::resource_scope;
use crate::validator::ValidatedJson;

use super::model::{
    BulkSignatureRequestDto, BulkSignatureResponse, CreateSignatureRequestDto,
    DeclineSignatureDto, PublicSignatureRequest, SignDocumentDto, SignatureFilterParams,
    SignatureRequest,
};
use super::service::SignatureService;

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/signature-requests",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = CreateSignatureRequestDto,
    responses(
        (status = 201, description = "Signature request sent", body = SignatureRequest),
        (status = 400, description = "Cancelled enrollment or no recipient address", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 409, description = "A pending request exists for this document", body = ErrorResponse)
    ),
    tag = "Signatures",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_request(
    State(state): State<AppState>,
    RequireSignaturesSend(auth_user): RequireSignaturesSend,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateSignatureRequestDto>,
) -> Result<(StatusCode, Json<SignatureRequest>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let request = SignatureService::create_request(
        &state.db,
        &state.email_config,
        EnrollmentId::from_uuid(id),
        scope,
        auth_user.user_id().ok(),
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/{id}/signature-requests",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Signature requests of the enrollment", body = Vec<SignatureRequest>),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Signatures",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollment_requests(
    State(state): State<AppState>,
    RequireSignaturesRead(auth_user): RequireSignaturesRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SignatureRequest>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let requests =
        SignatureService::get_enrollment_requests(&state.db, EnrollmentId::from_uuid(id), scope)
            .await?;
    Ok(Json(requests))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/signature-requests/bulk",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = BulkSignatureRequestDto,
    responses(
        (status = 200, description = "Requests sent and learners skipped", body = BulkSignatureResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Signatures",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_bulk_requests(
    State(state): State<AppState>,
    RequireSignaturesSend(auth_user): RequireSignaturesSend,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<BulkSignatureRequestDto>,
) -> Result<Json<BulkSignatureResponse>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let response = SignatureService::create_bulk_requests(
        &state.db,
        &state.email_config,
        SessionId::from_uuid(id),
        scope,
        auth_user.user_id().ok(),
        dto,
    )
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/signature-requests",
    params(SignatureFilterParams),
    responses(
        (status = 200, description = "Signature requests", body = Vec<SignatureRequest>)
    ),
    tag = "Signatures",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_requests(
    State(state): State<AppState>,
    RequireSignaturesRead(auth_user): RequireSignaturesRead,
    Query(params): Query<SignatureFilterParams>,
) -> Result<Json<Vec<SignatureRequest>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let requests = SignatureService::list_requests(&state.db, scope, params).await?;
    Ok(Json(requests))
}

#[utoipa::path(
    get,
    path = "/api/signature-requests/{id}",
    params(("id" = Uuid, Path, description = "Signature request ID")),
    responses(
        (status = 200, description = "Signature request", body = SignatureRequest),
        (status = 404, description = "Signature request not found", body = ErrorResponse)
    ),
    tag = "Signatures",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_request(
    State(state): State<AppState>,
    RequireSignaturesRead(auth_user): RequireSignaturesRead,
    Path(id): Path<Uuid>,
) -> Result<Json<SignatureRequest>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let request =
        SignatureService::load_request(&state.db, SignatureRequestId::from_uuid(id), scope)
            .await?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/api/signature-requests/{id}/cancel",
    params(("id" = Uuid, Path, description = "Signature request ID")),
    responses(
        (status = 200, description = "Signature request cancelled", body = SignatureRequest),
        (status = 404, description = "Signature request not found", body = ErrorResponse),
        (status = 409, description = "Request is no longer pending", body = ErrorResponse)
    ),
    tag = "Signatures",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_request(
    State(state): State<AppState>,
    RequireSignaturesSend(auth_user): RequireSignaturesSend,
    Path(id): Path<Uuid>,
) -> Result<Json<SignatureRequest>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let request =
        SignatureService::cancel_request(&state.db, SignatureRequestId::from_uuid(id), scope)
            .await?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/api/signature-requests/{id}/remind",
    params(("id" = Uuid, Path, description = "Signature request ID")),
    responses(
        (status = 200, description = "Reminder sent", body = SignatureRequest),
        (status = 400, description = "Request is expired or no longer pending", body = ErrorResponse),
        (status = 404, description = "Signature request not found", body = ErrorResponse)
    ),
    tag = "Signatures",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn send_reminder(
    State(state): State<AppState>,
    RequireSignaturesSend(auth_user): RequireSignaturesSend,
    Path(id): Path<Uuid>,
) -> Result<Json<SignatureRequest>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let request = SignatureService::send_reminder(
        &state.db,
        &state.email_config,
        SignatureRequestId::from_uuid(id),
        scope,
    )
    .await?;
    Ok(Json(request))
}

#[utoipa::path(
    get,
    path = "/api/signatures/{token}",
    params(("token" = String, Path, description = "Token from the signing link")),
    responses(
        (status = 200, description = "Request as seen by its recipient", body = PublicSignatureRequest),
        (status = 400, description = "Link expired or cancelled", body = ErrorResponse),
        (status = 404, description = "Unknown link", body = ErrorResponse)
    ),
    tag = "Signatures"
)]
#[instrument(skip(state, token))]
pub async fn get_public_request(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PublicSignatureRequest>, AppError> {
    let request = SignatureService::public_request(&state.db, &token).await?;
    Ok(Json(request))
}

#[utoipa::path(
    get,
    path = "/api/signatures/{token}/document",
    params(("token" = String, Path, description = "Token from the signing link")),
    responses(
        (status = 200, description = "Document to sign", content_type = "application/pdf"),
        (status = 400, description = "Link expired or cancelled", body = ErrorResponse),
        (status = 404, description = "Unknown link", body = ErrorResponse)
    ),
    tag = "Signatures"
)]
#[instrument(skip(state, token))]
pub async fn download_document(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<RenderedDocument, AppError> {
    SignatureService::public_document(&state.db, &token).await
}

#[utoipa::path(
    post,
    path = "/api/signatures/{token}/sign",
    params(("token" = String, Path, description = "Token from the signing link")),
    request_body = SignDocumentDto,
    responses(
        (status = 200, description = "Document signed", body = PublicSignatureRequest),
        (status = 400, description = "Link expired or cancelled", body = ErrorResponse),
        (status = 404, description = "Unknown link", body = ErrorResponse),
        (status = 409, description = "Already signed or declined", body = ErrorResponse)
    ),
    tag = "Signatures"
)]
#[instrument(skip(state, token, dto))]
pub async fn sign_document(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedJson(dto): ValidatedJson<SignDocumentDto>,
) -> Result<Json<PublicSignatureRequest>, AppError> {
    let request = SignatureService::sign(&state.db, &token, dto).await?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/api/signatures/{token}/decline",
    params(("token" = String, Path, description = "Token from the signing link")),
    request_body = DeclineSignatureDto,
    responses(
        (status = 200, description = "Document declined", body = PublicSignatureRequest),
        (status = 400, description = "Link expired or cancelled", body = ErrorResponse),
        (status = 404, description = "Unknown link", body = ErrorResponse),
        (status = 409, description = "Already signed or declined", body = ErrorResponse)
    ),
    tag = "Signatures"
)]
#[instrument(skip(state, token, dto))]
pub async fn decline_document(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedJson(dto): ValidatedJson<DeclineSignatureDto>,
) -> Result<Json<PublicSignatureRequest>, AppError> {
    let request = SignatureService::decline(&state.db, &token, dto).await?;
    Ok(Json(request))
}
