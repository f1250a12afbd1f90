use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::{EnrollmentId, PaymentId, SessionId};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireInvoicesCreate, RequirePaymentsCreate, RequirePaymentsDelete, RequirePaymentsRead,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::resource_scope;
use crate::validator::ValidatedJson;

use super::model::{CreatePaymentDto, Invoice, Payment};
use super::service::PaymentService;

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/payments",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = CreatePaymentDto,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Cancelled enrollment or amount above the balance", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn record_payment(
    State(state): State<AppState>,
    RequirePaymentsCreate(auth_user): RequirePaymentsCreate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreatePaymentDto>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let recorded_by = auth_user.user_id().ok();
    let payment = PaymentService::record_payment(
        &state.db,
        EnrollmentId::from_uuid(id),
        scope,
        recorded_by,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/{id}/payments",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Payments of the enrollment", body = Vec<Payment>),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollment_payments(
    State(state): State<AppState>,
    RequirePaymentsRead(auth_user): RequirePaymentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let payments =
        PaymentService::get_enrollment_payments(&state.db, EnrollmentId::from_uuid(id), scope)
            .await?;
    Ok(Json(payments))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/payments",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Payments of every enrollment in the session", body = Vec<Payment>),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_payments(
    State(state): State<AppState>,
    RequirePaymentsRead(auth_user): RequirePaymentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let payments =
        PaymentService::get_session_payments(&state.db, SessionId::from_uuid(id), scope).await?;
    Ok(Json(payments))
}

#[utoipa::path(
    delete,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 204, description = "Payment deleted and balance restored"),
        (status = 404, description = "Payment not found", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_payment(
    State(state): State<AppState>,
    RequirePaymentsDelete(auth_user): RequirePaymentsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    PaymentService::delete_payment(&state.db, PaymentId::from_uuid(id), scope).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/invoice",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 201, description = "Invoice issued", body = Invoice),
        (status = 400, description = "Cancelled enrollment", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 409, description = "Enrollment already invoiced", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_invoice(
    State(state): State<AppState>,
    RequireInvoicesCreate(auth_user): RequireInvoicesCreate,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let invoice =
        PaymentService::create_invoice(&state.db, EnrollmentId::from_uuid(id), scope).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}
