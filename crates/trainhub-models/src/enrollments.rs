//! Enrollments of learners into sessions.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::ids::{EnrollmentId, OrganizationId, SessionId, StudentId};
use crate::students::StudentSummary;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "enrollment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Pending,
    #[default]
    Confirmed,
    Completed,
    Cancelled,
    Failed,
}

impl EnrollmentStatus {
    /// Statuses that hold a seat in the session.
    pub const ACTIVE: [EnrollmentStatus; 2] = [Self::Confirmed, Self::Pending];

    pub fn holds_seat(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl PaymentStatus {
    /// `paid` once the full (non-zero) amount is covered, `partial` for any
    /// smaller positive payment, `pending` otherwise.
    pub fn from_amounts(paid: f64, total: f64) -> Self {
        if total > 0.0 && paid >= total {
            Self::Paid
        } else if paid > 0.0 {
            Self::Partial
        } else {
            Self::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub organization_id: OrganizationId,
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub enrollment_date: NaiveDate,
    pub status: EnrollmentStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn remaining_amount(&self) -> f64 {
        (self.total_amount - self.paid_amount).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentWithStudent {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub student: StudentSummary,
}

fn validate_amounts(paid: Option<f64>, total: Option<f64>) -> Result<(), ValidationError> {
    if let (Some(paid), Some(total)) = (paid, total)
        && paid > total
    {
        let mut err = ValidationError::new("paid_exceeds_total");
        err.message = Some("Paid amount cannot exceed total amount".into());
        return Err(err);
    }
    Ok(())
}

fn validate_create_amounts(dto: &CreateEnrollmentDto) -> Result<(), ValidationError> {
    validate_amounts(dto.paid_amount, dto.total_amount)
}

fn validate_update_amounts(dto: &UpdateEnrollmentDto) -> Result<(), ValidationError> {
    validate_amounts(dto.paid_amount, dto.total_amount)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_amounts", skip_on_field_errors = false))]
pub struct CreateEnrollmentDto {
    pub session_id: SessionId,
    pub student_id: StudentId,
    /// Defaults to today
    pub enrollment_date: Option<NaiveDate>,
    pub status: Option<EnrollmentStatus>,
    /// Derived from the amounts when omitted
    pub payment_status: Option<PaymentStatus>,
    /// Defaults to the session price, then the formation price
    #[validate(range(min = 0.0, message = "Total amount cannot be negative"))]
    pub total_amount: Option<f64>,
    #[validate(range(min = 0.0, message = "Paid amount cannot be negative"))]
    pub paid_amount: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_update_amounts", skip_on_field_errors = false))]
pub struct UpdateEnrollmentDto {
    pub status: Option<EnrollmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    #[validate(range(min = 0.0, message = "Total amount cannot be negative"))]
    pub total_amount: Option<f64>,
    #[validate(range(min = 0.0, message = "Paid amount cannot be negative"))]
    pub paid_amount: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkEnrollDto {
    #[validate(length(min = 1, max = 500))]
    pub student_ids: Vec<StudentId>,
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RejectedEnrollment {
    pub student_id: StudentId,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkEnrollResponse {
    pub enrolled: Vec<Enrollment>,
    pub rejected: Vec<RejectedEnrollment>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EnrollmentFilterParams {
    pub status: Option<EnrollmentStatus>,
}
