use chrono::{Datelike, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use trainhub_core::AppError;
use trainhub_models::enrollments::{Enrollment, EnrollmentStatus, PaymentStatus};
use trainhub_models::{EnrollmentId, OrganizationId, PaymentId, SessionId, UserId};

use crate::metrics::track_payment_recorded;
use crate::modules::sessions::service::SessionService;
use crate::utils::auth_helpers::ensure_in_scope;

use super::model::{CreatePaymentDto, Invoice, Payment};

/// Tolerance for floating point sums of amounts.
const AMOUNT_EPSILON: f64 = 0.005;

async fn lock_enrollment(
    conn: &mut PgConnection,
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

async fn set_paid_amount(
    conn: &mut PgConnection,
    enrollment: &Enrollment,
    paid_amount: f64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE enrollments SET paid_amount = $2, payment_status = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(enrollment.id.into_inner())
    .bind(paid_amount)
    .bind(PaymentStatus::from_amounts(paid_amount, enrollment.total_amount))
    .execute(conn)
    .await?;
    Ok(())
}

/// New paid amount after adding `amount`, or an error when it would exceed
/// the total.
pub fn apply_payment(enrollment: &Enrollment, amount: f64) -> Result<f64, AppError> {
    let paid = enrollment.paid_amount + amount;
    if paid > enrollment.total_amount + AMOUNT_EPSILON {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Payment exceeds the remaining amount ({:.2})",
            enrollment.remaining_amount()
        )));
    }
    Ok(paid.min(enrollment.total_amount))
}

pub struct PaymentService;

impl PaymentService {
    #[instrument(skip(db, dto), fields(enrollment.id = %enrollment_id, amount = dto.amount))]
    pub async fn record_payment(
        db: &PgPool,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
        recorded_by: Option<UserId>,
        dto: CreatePaymentDto,
    ) -> Result<Payment, AppError> {
        let mut tx = db.begin().await?;

        let enrollment = lock_enrollment(&mut tx, enrollment_id, scope).await?;

        if enrollment.status == EnrollmentStatus::Cancelled {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot record a payment for a cancelled enrollment"
            )));
        }

        let paid_amount = apply_payment(&enrollment, dto.amount)?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
                (organization_id, enrollment_id, amount, method, provider, reference,
                 paid_at, notes, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()), $8, $9)
            RETURNING *
            "#,
        )
        .bind(enrollment.organization_id.into_inner())
        .bind(enrollment_id.into_inner())
        .bind(dto.amount)
        .bind(dto.method)
        .bind(dto.provider)
        .bind(dto.reference)
        .bind(dto.paid_at)
        .bind(dto.notes)
        .bind(recorded_by.map(|id| id.into_inner()))
        .fetch_one(&mut *tx)
        .await?;

        set_paid_amount(&mut tx, &enrollment, paid_amount).await?;

        tx.commit().await?;

        track_payment_recorded(payment.method.as_str(), payment.amount);
        info!(payment.id = %payment.id, paid_amount, "Payment recorded");

        Ok(payment)
    }

    /// Removes a payment and takes its amount back off the enrollment.
    #[instrument(skip(db), fields(payment.id = %id))]
    pub async fn delete_payment(
        db: &PgPool,
        id: PaymentId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Payment not found")))?;

        ensure_in_scope(scope, payment.organization_id, "Payment")?;

        let mut tx = db.begin().await?;
        let enrollment = lock_enrollment(&mut tx, payment.enrollment_id, None).await?;

        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await?;

        let paid_amount = (enrollment.paid_amount - payment.amount).max(0.0);
        set_paid_amount(&mut tx, &enrollment, paid_amount).await?;

        tx.commit().await?;
        info!(paid_amount, "Payment reversed");

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_enrollment_payments(
        db: &PgPool,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
    ) -> Result<Vec<Payment>, AppError> {
        let owner = sqlx::query_scalar::<_, OrganizationId>(
            "SELECT organization_id FROM enrollments WHERE id = $1",
        )
        .bind(enrollment_id.into_inner())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Enrollment not found")))?;

        ensure_in_scope(scope, owner, "Enrollment")?;

        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE enrollment_id = $1 ORDER BY paid_at DESC",
        )
        .bind(enrollment_id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(payments)
    }

    #[instrument(skip(db))]
    pub async fn get_session_payments(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<Vec<Payment>, AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.* FROM payments p
            INNER JOIN enrollments e ON e.id = p.enrollment_id
            WHERE e.session_id = $1
            ORDER BY p.paid_at DESC
            "#,
        )
        .bind(session_id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(payments)
    }

    /// Issues the enrollment's invoice with the next number of the year.
    #[instrument(skip(db), fields(enrollment.id = %enrollment_id))]
    pub async fn create_invoice(
        db: &PgPool,
        enrollment_id: EnrollmentId,
        scope: Option<OrganizationId>,
    ) -> Result<Invoice, AppError> {
        let mut tx = db.begin().await?;
        let enrollment = lock_enrollment(&mut tx, enrollment_id, scope).await?;

        if enrollment.status == EnrollmentStatus::Cancelled {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot invoice a cancelled enrollment"
            )));
        }

        let already_invoiced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM invoices WHERE enrollment_id = $1)",
        )
        .bind(enrollment_id.into_inner())
        .fetch_one(&mut *tx)
        .await?;

        if already_invoiced {
            return Err(AppError::conflict(anyhow::anyhow!(
                "This enrollment has already been invoiced"
            )));
        }

        let year = Utc::now().year();
        let organization_id = enrollment.organization_id.into_inner();

        // Serializes numbering per organization and year.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("invoices:{}:{}", organization_id, year))
            .execute(&mut *tx)
            .await?;

        let sequence = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT COALESCE(MAX(sequence), 0) + 1 FROM invoices
            WHERE organization_id = $1 AND year = $2
            "#,
        )
        .bind(organization_id)
        .bind(year)
        .fetch_one(&mut *tx)
        .await?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (organization_id, enrollment_id, number, year, sequence, amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(enrollment_id.into_inner())
        .bind(Invoice::format_number(year, sequence))
        .bind(year)
        .bind(sequence)
        .bind(enrollment.total_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow::anyhow!(
                    "This enrollment has already been invoiced"
                ));
            }
            AppError::from(e)
        })?;

        tx.commit().await?;
        info!(invoice.number = %invoice.number, "Invoice issued");

        Ok(invoice)
    }
}
