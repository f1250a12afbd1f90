use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use trainhub_config::EmailConfig;
use trainhub_core::AppError;
use trainhub_models::enrollments::Enrollment;
use trainhub_models::formations::Formation;
use trainhub_models::organizations::Organization;
use trainhub_models::sessions::Session;
use trainhub_models::students::Student;
use trainhub_models::{EnrollmentId, OrganizationId, ProgramId, SessionId, StudentId};

use crate::metrics::{track_document_generated, track_email};
use crate::modules::enrollments::service::EnrollmentService;
use crate::modules::programs::service::ProgramService;
use crate::modules::reports::service::ReportService;
use crate::modules::sessions::service::SessionService;
use crate::utils::email::{EmailAttachment, EmailService};

use super::content::DocumentContent;
use super::emails::{EmailMessage, contract_email, convocation_email};
use super::model::{
    DocumentFormat, DocumentKind, DocumentQuery, EmailSentResponse, Language, RenderedDocument,
};
use super::naming::{enrollment_file_name, session_file_name, with_extension};
use super::pdf::render_pdf;
use super::templates::{self, LearnerContext, SessionContext};

/// Renders `content` in the requested format under `file_name`.
pub fn render(
    kind: DocumentKind,
    content: &DocumentContent,
    format: DocumentFormat,
    file_name: String,
) -> Result<RenderedDocument, AppError> {
    let rendered = match format {
        DocumentFormat::Pdf => RenderedDocument {
            file_name,
            content_type: "application/pdf",
            bytes: render_pdf(content)?,
        },
        DocumentFormat::Html => RenderedDocument {
            file_name: with_extension(&file_name, "html"),
            content_type: "text/html; charset=utf-8",
            bytes: content.to_html().into_bytes(),
        },
    };
    track_document_generated(kind.as_str());
    Ok(rendered)
}

pub struct DocumentService;

impl DocumentService {
    /// Loads everything the session's documents mention.
    pub async fn session_context(
        db: &PgPool,
        session: Session,
        language: Language,
    ) -> Result<SessionContext, AppError> {
        let organization =
            sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
                .bind(session.organization_id.into_inner())
                .fetch_one(db)
                .await?;

        let formation = sqlx::query_as::<_, Formation>("SELECT * FROM formations WHERE id = $1")
            .bind(session.formation_id.into_inner())
            .fetch_one(db)
            .await?;

        let programs = ProgramService::get_session_programs(db, session.id.into_inner()).await?;

        let trainer_name = match session.teacher_id {
            Some(teacher_id) => {
                sqlx::query_scalar::<_, String>(
                    "SELECT first_name || ' ' || last_name FROM users WHERE id = $1",
                )
                .bind(teacher_id.into_inner())
                .fetch_optional(db)
                .await?
            }
            None => None,
        };

        let learner_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments WHERE session_id = $1 AND status <> 'cancelled'",
        )
        .bind(session.id.into_inner())
        .fetch_one(db)
        .await?;

        Ok(SessionContext {
            language,
            organization,
            session,
            formation,
            programs,
            trainer_name,
            learner_count,
            issue_date: Utc::now().date_naive(),
        })
    }

    /// Learner details for a per-enrollment document. `None` when the
    /// student record is gone.
    pub async fn learner_context(
        db: &PgPool,
        enrollment: Enrollment,
    ) -> Result<Option<LearnerContext>, AppError> {
        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(enrollment.student_id.into_inner())
            .fetch_optional(db)
            .await?;

        let Some(student) = student else {
            return Ok(None);
        };

        let attendance_rate =
            Self::attendance_rate(db, enrollment.session_id, enrollment.student_id).await?;

        Ok(Some(LearnerContext {
            student,
            enrollment,
            attendance_rate,
        }))
    }

    async fn attendance_rate(
        db: &PgPool,
        session_id: SessionId,
        student_id: StudentId,
    ) -> Result<Option<i64>, AppError> {
        let (present, total) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE a.status IN ('present', 'late')),
                COUNT(*)
            FROM attendance a
            INNER JOIN session_slots sl ON sl.id = a.slot_id
            WHERE sl.session_id = $1 AND a.student_id = $2
            "#,
        )
        .bind(session_id.into_inner())
        .bind(student_id.into_inner())
        .fetch_one(db)
        .await?;

        Ok((total > 0).then(|| ((present as f64 / total as f64) * 100.0).round() as i64))
    }

    /// Builds a session-level document.
    #[instrument(skip(db, query), fields(session.id = %session_id, kind = %kind))]
    pub async fn session_document(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> Result<RenderedDocument, AppError> {
        if kind.is_per_enrollment() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Document '{}' is generated per enrollment",
                kind
            )));
        }

        let session = SessionService::load_session(db, session_id, scope).await?;
        let ctx = Self::session_context(db, session, query.language).await?;

        let (content, subject) = match kind {
            DocumentKind::Program => {
                let program = match query.program_id {
                    Some(id) => {
                        let id = ProgramId::from_uuid(id);
                        ctx.programs.iter().find(|p| p.id == id).ok_or_else(|| {
                            AppError::not_found(anyhow::anyhow!(
                                "Program not found for this session"
                            ))
                        })?
                    }
                    None => ctx.programs.first().ok_or_else(|| {
                        AppError::bad_request(anyhow::anyhow!("Session has no program"))
                    })?,
                };
                (templates::program(&ctx, program), program.name.clone())
            }
            DocumentKind::Terms => (templates::terms(&ctx), ctx.organization.name.clone()),
            DocumentKind::PrivacyPolicy => (
                templates::privacy_policy(&ctx),
                ctx.organization.name.clone(),
            ),
            DocumentKind::SessionReport => {
                let report = ReportService::build_session_report(db, session_id, scope).await?;
                (
                    templates::session_report(&ctx, &report),
                    ctx.session.name.clone(),
                )
            }
            _ => (templates::convention(&ctx), ctx.session.name.clone()),
        };

        render(kind, &content, query.format, session_file_name(kind, &subject))
    }

    /// Builds a per-enrollment document.
    #[instrument(skip(db, query), fields(enrollment.id = %enrollment_id, kind = %kind))]
    pub async fn enrollment_document(
        db: &PgPool,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> Result<RenderedDocument, AppError> {
        if !kind.is_per_enrollment() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Document '{}' is generated per session",
                kind
            )));
        }

        let (ctx, learner) =
            Self::enrollment_contexts(db, enrollment_id, scope, query.language).await?;

        let content = match kind {
            DocumentKind::Contract => templates::contract(&ctx, &learner),
            DocumentKind::AttendanceCertificate => {
                templates::attendance_certificate(&ctx, &learner)
            }
            _ => templates::convocation(&ctx, &learner),
        };

        let file_name = enrollment_file_name(
            kind,
            &learner.student.last_name,
            &learner.student.first_name,
        );
        render(kind, &content, query.format, file_name)
    }

    async fn enrollment_contexts(
        db: &PgPool,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
        language: Language,
    ) -> Result<(SessionContext, LearnerContext), AppError> {
        let enrollment = EnrollmentService::load_enrollment(db, enrollment_id, scope).await?;
        let session = SessionService::load_session(db, enrollment.session_id, None).await?;
        let ctx = Self::session_context(db, session, language).await?;
        let learner = Self::learner_context(db, enrollment)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;
        Ok((ctx, learner))
    }

    #[instrument(skip(db, email_config), fields(enrollment.id = %enrollment_id))]
    pub async fn send_convocation(
        db: &PgPool,
        email_config: &EmailConfig,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
        language: Language,
    ) -> Result<EmailSentResponse, AppError> {
        let (ctx, learner) = Self::enrollment_contexts(db, enrollment_id, scope, language).await?;
        let recipient = recipient(&learner)?;
        let message = convocation_email(&ctx, &learner);
        let attachment = convocation_attachment(&ctx, &learner)?;

        deliver(email_config, &recipient, &message, vec![attachment]).await?;

        Ok(EmailSentResponse {
            message: "Convocation sent".to_string(),
            recipient,
        })
    }

    #[instrument(skip(db, email_config), fields(enrollment.id = %enrollment_id))]
    pub async fn send_contract(
        db: &PgPool,
        email_config: &EmailConfig,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
        language: Language,
    ) -> Result<EmailSentResponse, AppError> {
        let (ctx, learner) = Self::enrollment_contexts(db, enrollment_id, scope, language).await?;
        let recipient = recipient(&learner)?;
        let message = contract_email(&ctx, &learner);

        let file_name = enrollment_file_name(
            DocumentKind::Contract,
            &learner.student.last_name,
            &learner.student.first_name,
        );
        let pdf = render(
            DocumentKind::Contract,
            &templates::contract(&ctx, &learner),
            DocumentFormat::Pdf,
            file_name,
        )?;

        deliver(
            email_config,
            &recipient,
            &message,
            vec![EmailAttachment::pdf(pdf.file_name, pdf.bytes)],
        )
        .await?;

        Ok(EmailSentResponse {
            message: "Contract sent".to_string(),
            recipient,
        })
    }
}

fn recipient(learner: &LearnerContext) -> Result<String, AppError> {
    learner
        .student
        .email
        .as_ref()
        .map(|e| e.as_str().to_string())
        .ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!("The student has no email address"))
        })
}

pub fn convocation_attachment(
    ctx: &SessionContext,
    learner: &LearnerContext,
) -> Result<EmailAttachment, AppError> {
    let file_name = enrollment_file_name(
        DocumentKind::Convocation,
        &learner.student.last_name,
        &learner.student.first_name,
    );
    let pdf = render(
        DocumentKind::Convocation,
        &templates::convocation(ctx, learner),
        DocumentFormat::Pdf,
        file_name,
    )?;
    Ok(EmailAttachment::pdf(pdf.file_name, pdf.bytes))
}

/// Sends one message and records the outcome.
pub async fn deliver(
    email_config: &EmailConfig,
    to: &str,
    message: &EmailMessage,
    attachments: Vec<EmailAttachment>,
) -> Result<(), AppError> {
    let service = EmailService::new(email_config.clone());
    let result = service
        .send_email(to, &message.subject, &message.text, &message.html, attachments)
        .await;

    track_email(result.is_ok());
    match &result {
        Ok(()) => info!(to = %to, subject = %message.subject, "Document email delivered"),
        Err(e) => warn!(to = %to, error = %e.error, "Document email failed"),
    }
    result
}
