//! Background document jobs.
//!
//! A job row is created in `pending`, then a spawned task walks the
//! session's enrollments one by one, persisting `current` after each item.
//! Archive jobs store their ZIP through [`FileStorage`] under
//! `jobs/<id>.zip`; the email job only counts successes and failures.
//!
//! [`FileStorage`]: trainhub_core::file_storage::FileStorage

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::{Instrument, error, info, info_span, instrument, warn};
use trainhub_core::AppError;
use trainhub_core::file_storage::StorageError;
use trainhub_models::enrollments::Enrollment;
use trainhub_models::students::Student;
use trainhub_models::{DocumentJobId, OrganizationId, SessionId, UserId};
use uuid::Uuid;

use crate::metrics::track_bulk_job_finished;
use crate::modules::sessions::service::SessionService;
use crate::state::AppState;
use crate::utils::auth_helpers::ensure_in_scope;

use super::archive::{ArchiveBuilder, sha256_hex};
use super::emails::convocation_email;
use super::model::{DocumentJob, DocumentJobKind, DocumentJobStatus, DocumentKind, Language};
use super::naming::{GENERAL_CONVENTION_ENTRY, archive_file_name, enrollment_file_name};
use super::pdf::render_pdf;
use super::service::{DocumentService, convocation_attachment, deliver};
use super::templates::{self, LearnerContext, SessionContext};

/// Non-cancelled enrollments of a session with their student, when it still
/// exists.
async fn job_items(
    db: &PgPool,
    session_id: SessionId,
) -> Result<Vec<(Enrollment, Option<Student>)>, AppError> {
    let enrollments = sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT * FROM enrollments
        WHERE session_id = $1 AND status <> 'cancelled'
        ORDER BY enrollment_date, created_at
        "#,
    )
    .bind(session_id.into_inner())
    .fetch_all(db)
    .await?;

    let student_ids: Vec<Uuid> = enrollments
        .iter()
        .map(|e| e.student_id.into_inner())
        .collect();

    let mut students: HashMap<Uuid, Student> =
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ANY($1)")
            .bind(&student_ids)
            .fetch_all(db)
            .await?
            .into_iter()
            .map(|s| (s.id.into_inner(), s))
            .collect();

    Ok(enrollments
        .into_iter()
        .map(|e| {
            let student = students.remove(&e.student_id.into_inner());
            (e, student)
        })
        .collect())
}

/// Number of steps a job will report for `items`.
pub fn job_total(kind: DocumentJobKind, items: &[(Enrollment, Option<Student>)]) -> i32 {
    let count = match kind {
        DocumentJobKind::ConventionsContracts => items.len() + 1,
        DocumentJobKind::Convocations => items.len(),
        DocumentJobKind::ConvocationEmails => items
            .iter()
            .filter(|(_, student)| student.as_ref().is_some_and(|s| s.email.is_some()))
            .count(),
    };
    count as i32
}

#[derive(Debug, Default)]
struct Progress {
    current: i32,
    success: i32,
    errors: i32,
}

async fn save_progress(db: &PgPool, id: DocumentJobId, progress: &Progress) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE document_jobs
        SET current = $2, success_count = $3, error_count = $4, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id.into_inner())
    .bind(progress.current)
    .bind(progress.success)
    .bind(progress.errors)
    .execute(db)
    .await?;
    Ok(())
}

async fn set_status(db: &PgPool, id: DocumentJobId, status: DocumentJobStatus) -> Result<(), AppError> {
    sqlx::query("UPDATE document_jobs SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id.into_inner())
        .bind(status)
        .execute(db)
        .await?;
    Ok(())
}

pub struct DocumentJobService;

impl DocumentJobService {
    /// Creates the job row and starts the background task.
    #[instrument(skip(state), fields(session.id = %session_id, kind = kind.as_str()))]
    pub async fn start_job(
        state: &AppState,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        created_by: Option<UserId>,
        kind: DocumentJobKind,
        language: Language,
    ) -> Result<DocumentJob, AppError> {
        let session = SessionService::load_session(&state.db, session_id, scope).await?;
        let items = job_items(&state.db, session_id).await?;

        let job = sqlx::query_as::<_, DocumentJob>(
            r#"
            INSERT INTO document_jobs
                (organization_id, session_id, kind, language, status, total, created_by)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING *
            "#,
        )
        .bind(session.organization_id.into_inner())
        .bind(session_id.into_inner())
        .bind(kind)
        .bind(language.as_str())
        .bind(job_total(kind, &items))
        .bind(created_by.map(|id| id.into_inner()))
        .fetch_one(&state.db)
        .await?;

        info!(job.id = %job.id, total = job.total, "Document job queued");

        let span = info_span!("document_job", job.id = %job.id, kind = kind.as_str());
        tokio::spawn(run_job(state.clone(), job.clone(), language, items).instrument(span));

        Ok(job)
    }

    /// Jobs still `pending` or `running` at startup lost their worker with the
    /// previous process.
    #[instrument(skip(db))]
    pub async fn fail_interrupted_jobs(db: &PgPool) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE document_jobs
            SET status = 'failed', error = 'Interrupted by a server restart',
                updated_at = NOW(), completed_at = NOW()
            WHERE status IN ('pending', 'running')
            "#,
        )
        .execute(db)
        .await?;

        let interrupted = result.rows_affected();
        if interrupted > 0 {
            warn!(interrupted, "Marked interrupted document jobs as failed");
        }
        Ok(interrupted)
    }

    pub async fn get_job(
        db: &PgPool,
        id: DocumentJobId,
        scope: Option<OrganizationId>,
    ) -> Result<DocumentJob, AppError> {
        let job = sqlx::query_as::<_, DocumentJob>("SELECT * FROM document_jobs WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Document job not found")))?;

        ensure_in_scope(scope, job.organization_id, "Document job")?;

        Ok(job)
    }

    #[instrument(skip(db))]
    pub async fn get_session_jobs(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<Vec<DocumentJob>, AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        let jobs = sqlx::query_as::<_, DocumentJob>(
            "SELECT * FROM document_jobs WHERE session_id = $1 ORDER BY created_at DESC",
        )
        .bind(session_id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(jobs)
    }

    /// File name and bytes of a finished archive.
    #[instrument(skip(state))]
    pub async fn download(
        state: &AppState,
        id: DocumentJobId,
        scope: Option<OrganizationId>,
    ) -> Result<(String, Vec<u8>), AppError> {
        let job = Self::get_job(&state.db, id, scope).await?;

        if !job.kind.produces_archive() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "This job does not produce an archive"
            )));
        }

        let (Some(key), Some(file_name)) = (job.archive_key, job.file_name) else {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Archive is not ready yet (status: {})",
                job.status.as_str()
            )));
        };
        if job.status != DocumentJobStatus::Completed {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Archive is not ready yet (status: {})",
                job.status.as_str()
            )));
        }

        let bytes = state.storage.load(&key).await.map_err(|e| match e {
            StorageError::NotFound => AppError::not_found(anyhow::anyhow!("Archive not found")),
            other => AppError::internal(other),
        })?;

        Ok((file_name, bytes))
    }
}

/// Works through the same `items` that `start_job` counted, so `current`
/// ends on `total`.
async fn run_job(
    state: AppState,
    job: DocumentJob,
    language: Language,
    items: Vec<(Enrollment, Option<Student>)>,
) {
    let result = match set_status(&state.db, job.id, DocumentJobStatus::Running).await {
        Ok(()) => execute(&state, &job, language, items).await,
        Err(e) => Err(e),
    };

    let status = match result {
        Ok(()) => DocumentJobStatus::Completed,
        Err(e) => {
            error!(error = %e.error, "Document job failed");
            let failed = sqlx::query(
                r#"
                UPDATE document_jobs
                SET status = 'failed', error = $2, updated_at = NOW(), completed_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(job.id.into_inner())
            .bind(e.error.to_string())
            .execute(&state.db)
            .await;
            if let Err(db_err) = failed {
                error!(error = %db_err, "Could not mark document job as failed");
            }
            DocumentJobStatus::Failed
        }
    };

    track_bulk_job_finished(job.kind.as_str(), status.as_str());
}

async fn execute(
    state: &AppState,
    job: &DocumentJob,
    language: Language,
    items: Vec<(Enrollment, Option<Student>)>,
) -> Result<(), AppError> {
    let db = &state.db;
    let session = SessionService::load_session(db, job.session_id, None).await?;
    let ctx = DocumentService::session_context(db, session, language).await?;

    match job.kind {
        DocumentJobKind::ConvocationEmails => send_convocations(state, job, &ctx, items).await,
        _ => build_archive(state, job, &ctx, items).await,
    }
}

async fn send_convocations(
    state: &AppState,
    job: &DocumentJob,
    ctx: &SessionContext,
    items: Vec<(Enrollment, Option<Student>)>,
) -> Result<(), AppError> {
    let db = &state.db;
    let mut progress = Progress::default();

    for (enrollment, student) in items {
        let Some(student) = student.filter(|s| s.email.is_some()) else {
            continue;
        };
        let to = student
            .email
            .as_ref()
            .map(|e| e.as_str().to_string())
            .unwrap_or_default();
        let learner = LearnerContext {
            student,
            enrollment,
            attendance_rate: None,
        };

        let sent = match convocation_attachment(ctx, &learner) {
            Ok(attachment) => {
                let message = convocation_email(ctx, &learner);
                deliver(&state.email_config, &to, &message, vec![attachment]).await
            }
            Err(e) => Err(e),
        };
        match sent {
            Ok(()) => progress.success += 1,
            Err(e) => {
                warn!(to = %to, error = %e.error, "Convocation email not sent");
                progress.errors += 1;
            }
        }

        progress.current += 1;
        save_progress(db, job.id, &progress).await?;
    }

    sqlx::query(
        r#"
        UPDATE document_jobs
        SET status = 'completed', updated_at = NOW(), completed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(job.id.into_inner())
    .execute(db)
    .await?;

    info!(sent = progress.success, failed = progress.errors, "Convocation emails sent");
    Ok(())
}

async fn build_archive(
    state: &AppState,
    job: &DocumentJob,
    ctx: &SessionContext,
    items: Vec<(Enrollment, Option<Student>)>,
) -> Result<(), AppError> {
    let db = &state.db;
    let mut progress = Progress::default();
    let mut archive = ArchiveBuilder::new();

    if job.kind == DocumentJobKind::ConventionsContracts {
        archive.add(GENERAL_CONVENTION_ENTRY, &render_pdf(&templates::convention(ctx))?)?;
        progress.current += 1;
        progress.success += 1;
        save_progress(db, job.id, &progress).await?;
    }

    for (enrollment, student) in items {
        let Some(student) = student else {
            warn!(enrollment.id = %enrollment.id, "Student missing, skipping");
            progress.current += 1;
            save_progress(db, job.id, &progress).await?;
            continue;
        };

        let learner = LearnerContext {
            student,
            enrollment,
            attendance_rate: None,
        };

        let (kind, content) = match job.kind {
            DocumentJobKind::ConventionsContracts => {
                (DocumentKind::Contract, templates::contract(ctx, &learner))
            }
            _ => (DocumentKind::Convocation, templates::convocation(ctx, &learner)),
        };

        let entry = enrollment_file_name(
            kind,
            &learner.student.last_name,
            &learner.student.first_name,
        );
        archive.add(&entry, &render_pdf(&content)?)?;

        progress.current += 1;
        progress.success += 1;
        save_progress(db, job.id, &progress).await?;
    }

    let bytes = archive.finish()?;
    let checksum = sha256_hex(&bytes);
    let key = state
        .storage
        .save(&format!("jobs/{}.zip", job.id), &bytes)
        .await?;
    let file_name = archive_file_name(job.kind, &ctx.session.name);

    sqlx::query(
        r#"
        UPDATE document_jobs
        SET status = 'completed', archive_key = $2, file_name = $3, checksum = $4,
            updated_at = NOW(), completed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(job.id.into_inner())
    .bind(&key)
    .bind(&file_name)
    .bind(&checksum)
    .execute(db)
    .await?;

    info!(archive = %file_name, size = bytes.len(), "Document archive stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use trainhub_models::enrollments::{EnrollmentStatus, PaymentStatus};
    use trainhub_models::students::StudentStatus;
    use trainhub_models::value_types::Email;
    use trainhub_models::{EnrollmentId, StudentId};

    use super::*;

    fn item(email: Option<&str>, with_student: bool) -> (Enrollment, Option<Student>) {
        let organization_id = OrganizationId::new();
        let student_id = StudentId::new();
        let enrollment = Enrollment {
            id: EnrollmentId::new(),
            organization_id,
            session_id: SessionId::new(),
            student_id,
            enrollment_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            status: EnrollmentStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            total_amount: 0.0,
            paid_amount: 0.0,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let student = with_student.then(|| Student {
            id: student_id,
            organization_id,
            first_name: "Awa".to_string(),
            last_name: "Koné".to_string(),
            email: email.map(Email::new_unchecked),
            phone: None,
            address: None,
            date_of_birth: None,
            student_number: None,
            company_name: None,
            status: StudentStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        (enrollment, student)
    }

    #[test]
    fn test_contracts_job_counts_the_general_convention() {
        let items = vec![item(None, true), item(None, true)];
        assert_eq!(job_total(DocumentJobKind::ConventionsContracts, &items), 3);
        assert_eq!(job_total(DocumentJobKind::Convocations, &items), 2);
        assert_eq!(job_total(DocumentJobKind::ConventionsContracts, &[]), 1);
    }

    #[test]
    fn test_email_job_counts_reachable_learners_only() {
        let items = vec![
            item(Some("awa@example.com"), true),
            item(None, true),
            item(Some("gone@example.com"), false),
        ];
        assert_eq!(job_total(DocumentJobKind::ConvocationEmails, &items), 1);
    }
}
