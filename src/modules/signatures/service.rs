use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use trainhub_config::EmailConfig;
use trainhub_core::AppError;
use trainhub_models::enrollments::{Enrollment, EnrollmentStatus};
use trainhub_models::{EnrollmentId, OrganizationId, SessionId, SignatureRequestId, UserId};
use uuid::Uuid;

use crate::metrics::track_signature_event;
use crate::modules::documents::model::{DocumentFormat, DocumentKind, RenderedDocument};
use crate::modules::documents::naming::{enrollment_file_name, session_file_name};
use crate::modules::documents::service::{DocumentService, deliver, render};
use crate::modules::documents::templates::{self, LearnerContext, SessionContext};
use crate::modules::enrollments::service::EnrollmentService;
use crate::modules::sessions::service::SessionService;
use crate::utils::auth_helpers::ensure_in_scope;

use super::emails::{default_subject, reminder_email, request_email, signing_url};
use super::model::{
    BulkSignatureRequestDto, BulkSignatureResponse, CreateSignatureRequestDto,
    DeclineSignatureDto, PublicSignatureRequest, RecipientType, SignDocumentDto,
    SignatureDocument, SignatureFilterParams, SignatureRequest, SignatureStatus,
    SkippedSignature, expiry_from,
};

/// 64 hex characters from two random v4 UUIDs.
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn map_pending_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!(
            "A pending signature request already exists for this document"
        ));
    }
    AppError::from(e)
}

/// Pending requests of the enrollment past their deadline become `expired`.
async fn expire_overdue(conn: &mut PgConnection, enrollment_id: EnrollmentId) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE signature_requests SET status = 'expired', updated_at = NOW()
        WHERE enrollment_id = $1 AND status = 'pending' AND expires_at <= NOW()
        "#,
    )
    .bind(enrollment_id.into_inner())
    .execute(conn)
    .await?;
    Ok(())
}

async fn mark_expired(db: &PgPool, id: SignatureRequestId) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE signature_requests SET status = 'expired', updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(id.into_inner())
    .execute(db)
    .await?;
    Ok(())
}

fn expired_error() -> AppError {
    AppError::bad_request(anyhow::anyhow!("Signature request has expired"))
}

/// What is stored for a new request, once recipient defaults are resolved.
struct NewRequest {
    document: SignatureDocument,
    recipient_type: RecipientType,
    recipient_name: String,
    recipient_email: String,
    subject: Option<String>,
    message: Option<String>,
    expires_in_days: i64,
    requested_by: Option<UserId>,
}

fn student_email(learner: &LearnerContext) -> Option<String> {
    learner.student.email.as_ref().map(|e| e.as_str().to_string())
}

pub struct SignatureService;

impl SignatureService {
    /// Inserts the request and emails the link; nothing is kept when the
    /// email cannot be sent.
    async fn open_request(
        db: &PgPool,
        email_config: &EmailConfig,
        ctx: &SessionContext,
        enrollment: &Enrollment,
        new: NewRequest,
    ) -> Result<SignatureRequest, AppError> {
        let mut tx = db.begin().await?;
        expire_overdue(&mut tx, enrollment.id).await?;

        let subject = new
            .subject
            .unwrap_or_else(|| default_subject(ctx, new.document));

        let request = sqlx::query_as::<_, SignatureRequest>(
            r#"
            INSERT INTO signature_requests
                (organization_id, session_id, enrollment_id, document, language,
                 recipient_type, recipient_name, recipient_email, subject, message,
                 token, expires_at, requested_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(enrollment.organization_id.into_inner())
        .bind(enrollment.session_id.into_inner())
        .bind(enrollment.id.into_inner())
        .bind(new.document)
        .bind(ctx.language.as_str())
        .bind(new.recipient_type)
        .bind(new.recipient_name.trim())
        .bind(&new.recipient_email)
        .bind(subject.trim())
        .bind(new.message)
        .bind(generate_token())
        .bind(expiry_from(Utc::now(), new.expires_in_days))
        .bind(new.requested_by.map(|id| id.into_inner()))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_pending_conflict)?;

        let url = signing_url(&email_config.frontend_url, &request.token);
        let message = request_email(ctx, &request, &url);
        deliver(email_config, &request.recipient_email, &message, Vec::new()).await?;

        tx.commit().await?;

        track_signature_event("requested");
        info!(
            signature.id = %request.id,
            document = ?request.document,
            "Signature request sent"
        );

        Ok(request)
    }

    /// Sends one document of the enrollment for signature. Recipient fields
    /// default to the enrolled learner.
    #[instrument(skip(db, email_config, dto), fields(enrollment.id = %enrollment_id))]
    pub async fn create_request(
        db: &PgPool,
        email_config: &EmailConfig,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
        requested_by: Option<UserId>,
        dto: CreateSignatureRequestDto,
    ) -> Result<SignatureRequest, AppError> {
        let enrollment = EnrollmentService::load_enrollment(db, enrollment_id, scope).await?;

        if enrollment.status == EnrollmentStatus::Cancelled {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot request a signature for a cancelled enrollment"
            )));
        }

        let session = SessionService::load_session(db, enrollment.session_id, None).await?;
        let ctx = DocumentService::session_context(db, session, dto.language).await?;
        let learner = DocumentService::learner_context(db, enrollment.clone())
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        let recipient_email = dto
            .recipient_email
            .map(|e| e.as_str().to_string())
            .or_else(|| student_email(&learner))
            .ok_or_else(|| {
                AppError::bad_request(anyhow::anyhow!("The recipient has no email address"))
            })?;

        let new = NewRequest {
            document: dto.document,
            recipient_type: dto.recipient_type,
            recipient_name: dto.recipient_name.unwrap_or_else(|| learner.full_name()),
            recipient_email,
            subject: dto.subject,
            message: dto.message,
            expires_in_days: dto.expires_in_days,
            requested_by,
        };

        Self::open_request(db, email_config, &ctx, &enrollment, new).await
    }

    /// One request per non-cancelled learner of the session. Learners that
    /// cannot receive one are reported instead of failing the batch.
    #[instrument(skip(db, email_config, dto), fields(session.id = %session_id))]
    pub async fn create_bulk_requests(
        db: &PgPool,
        email_config: &EmailConfig,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        requested_by: Option<UserId>,
        dto: BulkSignatureRequestDto,
    ) -> Result<BulkSignatureResponse, AppError> {
        let session = SessionService::load_session(db, session_id, scope).await?;
        let ctx = DocumentService::session_context(db, session, dto.language).await?;

        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT * FROM enrollments
            WHERE session_id = $1 AND status <> 'cancelled'
            ORDER BY created_at
            "#,
        )
        .bind(session_id.into_inner())
        .fetch_all(db)
        .await?;

        let total = enrollments.len();
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        for enrollment in enrollments {
            let enrollment_id = enrollment.id;
            let Some(learner) = DocumentService::learner_context(db, enrollment.clone()).await?
            else {
                skipped.push(SkippedSignature {
                    enrollment_id,
                    reason: "Student not found".to_string(),
                });
                continue;
            };
            let Some(recipient_email) = student_email(&learner) else {
                skipped.push(SkippedSignature {
                    enrollment_id,
                    reason: "The student has no email address".to_string(),
                });
                continue;
            };

            let new = NewRequest {
                document: dto.document,
                recipient_type: RecipientType::Student,
                recipient_name: learner.full_name(),
                recipient_email,
                subject: dto.subject.clone(),
                message: dto.message.clone(),
                expires_in_days: dto.expires_in_days,
                requested_by,
            };

            match Self::open_request(db, email_config, &ctx, &enrollment, new).await {
                Ok(request) => created.push(request),
                Err(e) => {
                    warn!(enrollment.id = %enrollment_id, error = %e.error, "Signature request skipped");
                    skipped.push(SkippedSignature {
                        enrollment_id,
                        reason: e.error.to_string(),
                    });
                }
            }
        }

        info!(total, created = created.len(), skipped = skipped.len(), "Bulk signature requests");

        Ok(BulkSignatureResponse {
            total,
            created,
            skipped,
        })
    }

    #[instrument(skip(db))]
    pub async fn load_request(
        db: &PgPool,
        id: SignatureRequestId,
        scope: Option<OrganizationId>,
    ) -> Result<SignatureRequest, AppError> {
        let request =
            sqlx::query_as::<_, SignatureRequest>("SELECT * FROM signature_requests WHERE id = $1")
                .bind(id.into_inner())
                .fetch_optional(db)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(anyhow::anyhow!("Signature request not found"))
                })?;

        ensure_in_scope(scope, request.organization_id, "Signature request")?;

        Ok(request)
    }

    #[instrument(skip(db, params))]
    pub async fn list_requests(
        db: &PgPool,
        scope: Option<OrganizationId>,
        params: SignatureFilterParams,
    ) -> Result<Vec<SignatureRequest>, AppError> {
        let requests = sqlx::query_as::<_, SignatureRequest>(
            r#"
            SELECT * FROM signature_requests
            WHERE ($1::uuid IS NULL OR organization_id = $1)
              AND ($2::signature_status IS NULL OR status = $2)
              AND ($3::signature_recipient_type IS NULL OR recipient_type = $3)
              AND ($4::uuid IS NULL OR session_id = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(scope.map(|id| id.into_inner()))
        .bind(params.status)
        .bind(params.recipient_type)
        .bind(params.session_id)
        .fetch_all(db)
        .await?;

        Ok(requests)
    }

    #[instrument(skip(db))]
    pub async fn get_enrollment_requests(
        db: &PgPool,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
    ) -> Result<Vec<SignatureRequest>, AppError> {
        EnrollmentService::load_enrollment(db, enrollment_id, scope).await?;

        let requests = sqlx::query_as::<_, SignatureRequest>(
            "SELECT * FROM signature_requests WHERE enrollment_id = $1 ORDER BY created_at DESC",
        )
        .bind(enrollment_id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(requests)
    }

    #[instrument(skip(db), fields(signature.id = %id))]
    pub async fn cancel_request(
        db: &PgPool,
        id: SignatureRequestId,
        scope: Option<OrganizationId>,
    ) -> Result<SignatureRequest, AppError> {
        let request = Self::load_request(db, id, scope).await?;
        if request.status_at(Utc::now()) == SignatureStatus::Expired {
            mark_expired(db, id).await?;
        }

        let cancelled = sqlx::query_as::<_, SignatureRequest>(
            r#"
            UPDATE signature_requests
            SET status = 'cancelled', cancelled_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND expires_at > NOW()
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| {
            AppError::conflict(anyhow::anyhow!(
                "Only pending signature requests can be cancelled"
            ))
        })?;

        track_signature_event("cancelled");
        info!("Signature request cancelled");

        Ok(cancelled)
    }

    /// Emails the link again and counts the reminder.
    #[instrument(skip(db, email_config), fields(signature.id = %id))]
    pub async fn send_reminder(
        db: &PgPool,
        email_config: &EmailConfig,
        id: SignatureRequestId,
        scope: Option<OrganizationId>,
    ) -> Result<SignatureRequest, AppError> {
        let request = Self::load_request(db, id, scope).await?;

        match request.status_at(Utc::now()) {
            SignatureStatus::Pending => {}
            SignatureStatus::Expired => {
                mark_expired(db, id).await?;
                return Err(expired_error());
            }
            _ => {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Only pending signature requests can be reminded"
                )));
            }
        }

        let session = SessionService::load_session(db, request.session_id, None).await?;
        let ctx = DocumentService::session_context(db, session, request.language()).await?;
        let url = signing_url(&email_config.frontend_url, &request.token);
        let message = reminder_email(&ctx, &request, &url);

        deliver(email_config, &request.recipient_email, &message, Vec::new()).await?;

        let reminded = sqlx::query_as::<_, SignatureRequest>(
            r#"
            UPDATE signature_requests
            SET reminder_count = reminder_count + 1, last_reminder_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .fetch_one(db)
        .await?;

        track_signature_event("reminded");
        info!(reminders = reminded.reminder_count, "Signature reminder sent");

        Ok(reminded)
    }

    /// Looks a request up by its link token. Cancelled and expired links
    /// are refused; answered ones stay readable.
    async fn by_token(db: &PgPool, token: &str) -> Result<SignatureRequest, AppError> {
        let request = sqlx::query_as::<_, SignatureRequest>(
            "SELECT * FROM signature_requests WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Signature request not found")))?;

        match request.status_at(Utc::now()) {
            SignatureStatus::Expired => {
                mark_expired(db, request.id).await?;
                Err(expired_error())
            }
            SignatureStatus::Cancelled => Err(AppError::bad_request(anyhow::anyhow!(
                "Signature request has been cancelled"
            ))),
            _ => Ok(request),
        }
    }

    async fn contexts(
        db: &PgPool,
        request: &SignatureRequest,
    ) -> Result<(SessionContext, LearnerContext), AppError> {
        let enrollment = EnrollmentService::load_enrollment(db, request.enrollment_id, None).await?;
        let session = SessionService::load_session(db, request.session_id, None).await?;
        let ctx = DocumentService::session_context(db, session, request.language()).await?;
        let learner = DocumentService::learner_context(db, enrollment)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;
        Ok((ctx, learner))
    }

    #[instrument(skip(db, token))]
    pub async fn public_request(
        db: &PgPool,
        token: &str,
    ) -> Result<PublicSignatureRequest, AppError> {
        let request = Self::by_token(db, token).await?;
        let session = SessionService::load_session(db, request.session_id, None).await?;
        let ctx = DocumentService::session_context(db, session, request.language()).await?;

        Ok(PublicSignatureRequest {
            id: request.id,
            document: request.document,
            status: request.status,
            recipient_name: request.recipient_name,
            subject: request.subject,
            message: request.message,
            organization_name: ctx.organization.name,
            session_name: ctx.session.name,
            formation_name: ctx.formation.name,
            expires_at: request.expires_at,
            signed_at: request.signed_at,
        })
    }

    /// The PDF the recipient is asked to sign, in the request's language.
    #[instrument(skip(db, token))]
    pub async fn public_document(db: &PgPool, token: &str) -> Result<RenderedDocument, AppError> {
        let request = Self::by_token(db, token).await?;
        let (ctx, learner) = Self::contexts(db, &request).await?;

        let kind = DocumentKind::from(request.document);
        let (content, file_name) = match request.document {
            SignatureDocument::Convention => (
                templates::convention(&ctx),
                session_file_name(kind, &ctx.session.name),
            ),
            SignatureDocument::Contract => (
                templates::contract(&ctx, &learner),
                enrollment_file_name(kind, &learner.student.last_name, &learner.student.first_name),
            ),
        };

        render(kind, &content, DocumentFormat::Pdf, file_name)
    }

    async fn answer(
        db: &PgPool,
        token: &str,
        status: SignatureStatus,
        signer_name: Option<&str>,
        reason: Option<&str>,
    ) -> Result<SignatureRequest, AppError> {
        let request = Self::by_token(db, token).await?;

        let answered = sqlx::query_as::<_, SignatureRequest>(
            r#"
            UPDATE signature_requests
            SET status = $2,
                signer_name = $3,
                signed_at = CASE WHEN $2 = 'signed'::signature_status THEN NOW() END,
                declined_at = CASE WHEN $2 = 'declined'::signature_status THEN NOW() END,
                decline_reason = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND expires_at > NOW()
            RETURNING *
            "#,
        )
        .bind(request.id.into_inner())
        .bind(status)
        .bind(signer_name)
        .bind(reason)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| {
            AppError::conflict(anyhow::anyhow!("Signature request has already been answered"))
        })?;

        track_signature_event(status.as_str());
        info!(signature.id = %answered.id, status = status.as_str(), "Signature request answered");

        Ok(answered)
    }

    #[instrument(skip(db, token, dto))]
    pub async fn sign(
        db: &PgPool,
        token: &str,
        dto: SignDocumentDto,
    ) -> Result<PublicSignatureRequest, AppError> {
        Self::answer(db, token, SignatureStatus::Signed, Some(dto.signer_name.trim()), None).await?;
        Self::public_request(db, token).await
    }

    #[instrument(skip(db, token, dto))]
    pub async fn decline(
        db: &PgPool,
        token: &str,
        dto: DeclineSignatureDto,
    ) -> Result<PublicSignatureRequest, AppError> {
        let reason = dto.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
        Self::answer(db, token, SignatureStatus::Declined, None, reason).await?;
        Self::public_request(db, token).await
    }
}
