use chrono::Utc;
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument, warn};
use trainhub_cache::{RedisCache, invalidate};
use trainhub_core::AppError;
use trainhub_models::students::StudentSummary;
use trainhub_models::value_types::Email;
use trainhub_models::{EnrollmentId, OrganizationId, SessionId, StudentId};

use crate::metrics::{track_enrollment_created, track_enrollment_rejected};
use crate::modules::sessions::model::{Session, SessionStatus};
use crate::modules::sessions::service::SessionService;
use crate::utils::auth_helpers::ensure_in_scope;

use super::model::{
    BulkEnrollDto, BulkEnrollResponse, CreateEnrollmentDto, Enrollment, EnrollmentFilterParams,
    EnrollmentStatus, EnrollmentWithStudent, PaymentStatus, RejectedEnrollment, SessionCapacity,
    UpdateEnrollmentDto,
};

const DUPLICATE_ENROLLMENT: &str = "This student is already enrolled in this session";

#[derive(FromRow)]
struct EnrollmentRow {
    #[sqlx(flatten)]
    enrollment: Enrollment,
    student_first_name: String,
    student_last_name: String,
    student_email: Option<Email>,
    student_phone: Option<String>,
}

impl From<EnrollmentRow> for EnrollmentWithStudent {
    fn from(row: EnrollmentRow) -> Self {
        Self {
            student: StudentSummary {
                id: row.enrollment.student_id,
                first_name: row.student_first_name,
                last_name: row.student_last_name,
                email: row.student_email,
                phone: row.student_phone,
            },
            enrollment: row.enrollment,
        }
    }
}

fn amounts_exceeded() -> AppError {
    AppError::unprocessable(anyhow::anyhow!("Paid amount cannot exceed total amount"))
}

fn full_session(capacity_max: i32) -> AppError {
    AppError::conflict(anyhow::anyhow!(
        "Session is full ({} learners maximum)",
        capacity_max
    ))
}

/// Re-reads the session under a row lock so concurrent enrollments queue up
/// behind the capacity check.
async fn lock_session(
    conn: &mut sqlx::PgConnection,
    session_id: SessionId,
) -> Result<Session, AppError> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1 FOR UPDATE")
        .bind(session_id.into_inner())
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Session not found")))
}

async fn ensure_seat_available(
    conn: &mut sqlx::PgConnection,
    session: &Session,
) -> Result<(), AppError> {
    if let Some(capacity_max) = session.capacity_max.filter(|max| *max > 0) {
        let active = SessionService::active_enrollment_count(conn, session.id).await?;
        if active >= i64::from(capacity_max) {
            return Err(full_session(capacity_max));
        }
    }
    Ok(())
}

async fn lock_enrollment(
    conn: &mut sqlx::PgConnection,
    id: EnrollmentId,
    scope: Option<OrganizationId>,
) -> Result<Enrollment, AppError> {
    let enrollment =
        sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1 FOR UPDATE")
            .bind(id.into_inner())
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Enrollment not found")))?;

    ensure_in_scope(scope, enrollment.organization_id, "Enrollment")?;

    Ok(enrollment)
}

/// Guards shared by every path that moves an enrollment to `cancelled`.
async fn ensure_cancellable(
    conn: &mut sqlx::PgConnection,
    enrollment: &Enrollment,
) -> Result<(), AppError> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
        .bind(enrollment.session_id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Session not found")))?;

    if session.status == SessionStatus::Completed || session.end_date < Utc::now().date_naive() {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Cannot cancel an enrollment of a completed session"
        )));
    }

    let invoiced = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM invoices WHERE enrollment_id = $1)",
    )
    .bind(enrollment.id.into_inner())
    .fetch_one(&mut *conn)
    .await?;

    if invoiced {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Cannot cancel an enrollment that has been invoiced"
        )));
    }

    Ok(())
}

pub struct EnrollmentService;

impl EnrollmentService {
    /// Loads an enrollment, hiding enrollments outside `scope`.
    pub async fn load_enrollment(
        db: &PgPool,
        id: EnrollmentId,
        scope: Option<OrganizationId>,
    ) -> Result<Enrollment, AppError> {
        let enrollment = sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Enrollment not found")))?;

        ensure_in_scope(scope, enrollment.organization_id, "Enrollment")?;

        Ok(enrollment)
    }

    /// Enrolls one student. Checks run in this order: amounts, session and
    /// student existence, session still open, duplicate, capacity.
    #[instrument(skip(db, cache, dto), fields(session.id = %dto.session_id, student.id = %dto.student_id))]
    pub async fn create_enrollment(
        db: &PgPool,
        cache: Option<&RedisCache>,
        scope: Option<OrganizationId>,
        dto: CreateEnrollmentDto,
    ) -> Result<Enrollment, AppError> {
        let result = Self::enroll(db, scope, dto).await;

        match &result {
            Ok(enrollment) => {
                track_enrollment_created();
                invalidate::session(
                    cache,
                    enrollment.organization_id.into_inner(),
                    Some(enrollment.session_id.into_inner()),
                )
                .await;
                info!(enrollment.id = %enrollment.id, "Student enrolled");
            }
            Err(e) => {
                track_enrollment_rejected(e.status.as_str());
                warn!(error = %e.error, "Enrollment rejected");
            }
        }

        result
    }

    async fn enroll(
        db: &PgPool,
        scope: Option<OrganizationId>,
        dto: CreateEnrollmentDto,
    ) -> Result<Enrollment, AppError> {
        if let (Some(paid), Some(total)) = (dto.paid_amount, dto.total_amount)
            && paid > total
        {
            return Err(amounts_exceeded());
        }

        let session = SessionService::load_session(db, dto.session_id, scope).await?;
        let organization_id = session.organization_id;

        let student_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = $1 AND organization_id = $2)",
        )
        .bind(dto.student_id.into_inner())
        .bind(organization_id.into_inner())
        .fetch_one(db)
        .await?;

        if !student_exists {
            return Err(AppError::not_found(anyhow::anyhow!("Student not found")));
        }

        let total_amount = match dto.total_amount {
            Some(total) => total,
            None => {
                let formation_price = sqlx::query_scalar::<_, f64>(
                    "SELECT price FROM formations WHERE id = $1",
                )
                .bind(session.formation_id.into_inner())
                .fetch_optional(db)
                .await?;
                session.price.or(formation_price).unwrap_or(0.0)
            }
        };
        let paid_amount = dto.paid_amount.unwrap_or(0.0);

        if paid_amount > total_amount {
            return Err(amounts_exceeded());
        }

        let status = dto.status.unwrap_or_default();
        let payment_status = dto
            .payment_status
            .unwrap_or_else(|| PaymentStatus::from_amounts(paid_amount, total_amount));

        let mut tx = db.begin().await?;

        let session = lock_session(&mut *tx, session.id).await?;

        if !session.accepts_enrollments(Utc::now().date_naive()) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot enroll in a completed or cancelled session"
            )));
        }

        let already_enrolled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE session_id = $1 AND student_id = $2)",
        )
        .bind(session.id.into_inner())
        .bind(dto.student_id.into_inner())
        .fetch_one(&mut *tx)
        .await?;

        if already_enrolled {
            return Err(AppError::conflict(anyhow::anyhow!(DUPLICATE_ENROLLMENT)));
        }

        if status.holds_seat() {
            ensure_seat_available(&mut *tx, &session).await?;
        }

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments
                (organization_id, session_id, student_id, enrollment_date, status,
                 payment_status, total_amount, paid_amount, notes)
            VALUES ($1, $2, $3, COALESCE($4, CURRENT_DATE), $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(session.id.into_inner())
        .bind(dto.student_id.into_inner())
        .bind(dto.enrollment_date)
        .bind(status)
        .bind(payment_status)
        .bind(total_amount)
        .bind(paid_amount)
        .bind(dto.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("enrollments_session_student_key")
            {
                return AppError::conflict(anyhow::anyhow!(DUPLICATE_ENROLLMENT));
            }
            AppError::from(e)
        })?;

        tx.commit().await?;

        Ok(enrollment)
    }

    /// Enrolls each student independently; one rejection does not stop the
    /// others.
    #[instrument(skip(db, cache, dto), fields(session.id = %session_id, students = dto.student_ids.len()))]
    pub async fn bulk_enroll(
        db: &PgPool,
        cache: Option<&RedisCache>,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        dto: BulkEnrollDto,
    ) -> Result<BulkEnrollResponse, AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        let mut enrolled = Vec::new();
        let mut rejected = Vec::new();

        for student_id in dto.student_ids {
            let single = CreateEnrollmentDto {
                session_id,
                student_id,
                enrollment_date: None,
                status: dto.status,
                payment_status: None,
                total_amount: None,
                paid_amount: None,
                notes: None,
            };

            match Self::create_enrollment(db, cache, scope, single).await {
                Ok(enrollment) => enrolled.push(enrollment),
                Err(e) => rejected.push(RejectedEnrollment {
                    student_id,
                    reason: e.error.to_string(),
                }),
            }
        }

        info!(
            enrolled = enrolled.len(),
            rejected = rejected.len(),
            "Bulk enrollment finished"
        );

        Ok(BulkEnrollResponse { enrolled, rejected })
    }

    #[instrument(skip(db))]
    pub async fn get_session_enrollments(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        filters: EnrollmentFilterParams,
    ) -> Result<Vec<EnrollmentWithStudent>, AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT
                e.*,
                st.first_name AS student_first_name,
                st.last_name AS student_last_name,
                st.email AS student_email,
                st.phone AS student_phone
            FROM enrollments e
            INNER JOIN students st ON st.id = e.student_id
            WHERE e.session_id = $1
              AND ($2::enrollment_status IS NULL OR e.status = $2)
            ORDER BY st.last_name, st.first_name
            "#,
        )
        .bind(session_id.into_inner())
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(EnrollmentWithStudent::from).collect())
    }

    #[instrument(skip(db))]
    pub async fn get_enrollment(
        db: &PgPool,
        id: EnrollmentId,
        scope: Option<OrganizationId>,
    ) -> Result<EnrollmentWithStudent, AppError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT
                e.*,
                st.first_name AS student_first_name,
                st.last_name AS student_last_name,
                st.email AS student_email,
                st.phone AS student_phone
            FROM enrollments e
            INNER JOIN students st ON st.id = e.student_id
            WHERE e.id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Enrollment not found")))?;

        ensure_in_scope(scope, row.enrollment.organization_id, "Enrollment")?;

        Ok(row.into())
    }

    #[instrument(skip(db, cache, dto), fields(enrollment.id = %id))]
    pub async fn update_enrollment(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: EnrollmentId,
        scope: Option<OrganizationId>,
        dto: UpdateEnrollmentDto,
    ) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await?;
        let existing = lock_enrollment(&mut *tx, id, scope).await?;

        let total_amount = dto.total_amount.unwrap_or(existing.total_amount);
        let paid_amount = dto.paid_amount.unwrap_or(existing.paid_amount);
        if paid_amount > total_amount {
            return Err(amounts_exceeded());
        }

        let amounts_changed = dto.total_amount.is_some() || dto.paid_amount.is_some();
        let payment_status = match dto.payment_status {
            Some(status) => status,
            None if amounts_changed => PaymentStatus::from_amounts(paid_amount, total_amount),
            None => existing.payment_status,
        };
        let status = dto.status.unwrap_or(existing.status);

        if status == EnrollmentStatus::Cancelled && existing.status != EnrollmentStatus::Cancelled {
            ensure_cancellable(&mut *tx, &existing).await?;
        }

        // Taking back a seat goes through the same capacity check as a new enrollment.
        if status.holds_seat() && !existing.status.holds_seat() {
            let session = lock_session(&mut *tx, existing.session_id).await?;
            ensure_seat_available(&mut *tx, &session).await?;
        }

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments SET
                status = $2,
                payment_status = $3,
                total_amount = $4,
                paid_amount = $5,
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(status)
        .bind(payment_status)
        .bind(total_amount)
        .bind(paid_amount)
        .bind(dto.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        invalidate::session(
            cache,
            enrollment.organization_id.into_inner(),
            Some(enrollment.session_id.into_inner()),
        )
        .await;

        Ok(enrollment)
    }

    #[instrument(skip(db, cache), fields(enrollment.id = %id))]
    pub async fn cancel_enrollment(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: EnrollmentId,
        scope: Option<OrganizationId>,
    ) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await?;
        let enrollment = lock_enrollment(&mut *tx, id, scope).await?;
        ensure_cancellable(&mut *tx, &enrollment).await?;

        let cancelled = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(EnrollmentStatus::Cancelled)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        invalidate::session(
            cache,
            cancelled.organization_id.into_inner(),
            Some(cancelled.session_id.into_inner()),
        )
        .await;
        info!("Enrollment cancelled");

        Ok(cancelled)
    }

    #[instrument(skip(db, cache), fields(enrollment.id = %id))]
    pub async fn delete_enrollment(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: EnrollmentId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        let enrollment = Self::load_enrollment(db, id, scope).await?;

        let has_financial_records = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM payments WHERE enrollment_id = $1)
                OR EXISTS(SELECT 1 FROM invoices WHERE enrollment_id = $1)
            "#,
        )
        .bind(id.into_inner())
        .fetch_one(db)
        .await?;

        if has_financial_records {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot delete an enrollment with recorded payments"
            )));
        }

        sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id.into_inner())
            .execute(db)
            .await?;

        invalidate::session(
            cache,
            enrollment.organization_id.into_inner(),
            Some(enrollment.session_id.into_inner()),
        )
        .await;

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_session_capacity(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<SessionCapacity, AppError> {
        let session = SessionService::load_session(db, session_id, scope).await?;
        let mut conn = db.acquire().await?;
        let active = SessionService::active_enrollment_count(&mut conn, session_id).await?;
        Ok(SessionCapacity::compute(session.capacity_max, active))
    }

    /// Students enrolled in a session whose enrollment is not cancelled.
    pub async fn is_enrolled(
        db: &PgPool,
        session_id: SessionId,
        student_id: StudentId,
    ) -> Result<bool, AppError> {
        let enrolled = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM enrollments
                WHERE session_id = $1 AND student_id = $2 AND status <> 'cancelled'
            )
            "#,
        )
        .bind(session_id.into_inner())
        .bind(student_id.into_inner())
        .fetch_one(db)
        .await?;
        Ok(enrolled)
    }
}
