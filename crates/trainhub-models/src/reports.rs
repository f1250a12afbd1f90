//! Session and organization reporting views.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::serde::deserialize_optional_uuid;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::enrollments::{EnrollmentStatus, PaymentStatus};
use crate::formations::FormationSummary;
use crate::ids::{EnrollmentId, SessionId, StudentId};
use crate::sessions::Session;

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct EnrollmentCounts {
    pub total: i64,
    /// Confirmed or pending
    pub active: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct FinanceSummary {
    pub total_revenue: f64,
    pub paid_amount: f64,
    pub remaining: f64,
}

impl FinanceSummary {
    pub fn new(total_revenue: f64, paid_amount: f64) -> Self {
        Self {
            total_revenue,
            paid_amount,
            remaining: total_revenue - paid_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentReportRow {
    pub enrollment_id: EnrollmentId,
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub enrollment_date: NaiveDate,
    pub status: EnrollmentStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub attendance_rate: i64,
    /// Average grade on a /20 scale, absent when the learner has no grade
    pub average_grade: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionReport {
    pub session: Session,
    pub formation: FormationSummary,
    pub enrollments: EnrollmentCounts,
    pub attendance_rate: i64,
    pub average_grade: Option<f64>,
    pub average_percentage: Option<f64>,
    pub finances: FinanceSummary,
    pub students: Vec<StudentReportRow>,
}

/// CSV line of the per-learner session export.
#[derive(Debug, Serialize)]
pub struct StudentReportCsvRow<'a> {
    #[serde(rename = "Nom")]
    pub last_name: &'a str,
    #[serde(rename = "Prénom")]
    pub first_name: &'a str,
    #[serde(rename = "Email")]
    pub email: &'a str,
    #[serde(rename = "Date d'inscription")]
    pub enrollment_date: String,
    #[serde(rename = "Statut")]
    pub status: &'static str,
    #[serde(rename = "Paiement")]
    pub payment_status: &'static str,
    #[serde(rename = "Montant total")]
    pub total_amount: f64,
    #[serde(rename = "Montant payé")]
    pub paid_amount: f64,
    #[serde(rename = "Présence (%)")]
    pub attendance_rate: i64,
    #[serde(rename = "Moyenne (/20)")]
    pub average_grade: String,
}

impl<'a> From<&'a StudentReportRow> for StudentReportCsvRow<'a> {
    fn from(row: &'a StudentReportRow) -> Self {
        Self {
            last_name: &row.last_name,
            first_name: &row.first_name,
            email: row.email.as_deref().unwrap_or_default(),
            enrollment_date: row.enrollment_date.format("%d/%m/%Y").to_string(),
            status: row.status.as_str(),
            payment_status: row.payment_status.as_str(),
            total_amount: row.total_amount,
            paid_amount: row.paid_amount,
            attendance_rate: row.attendance_rate,
            average_grade: row
                .average_grade
                .map(|g| format!("{g:.2}"))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct UpcomingSession {
    pub id: SessionId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity_max: Option<i32>,
    pub enrolled_count: i64,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DashboardParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardReport {
    /// Session counts keyed by status
    pub sessions_by_status: BTreeMap<String, i64>,
    /// Sessions starting within the next 30 days
    pub upcoming_sessions: Vec<UpcomingSession>,
    pub active_students: i64,
    pub enrollments_this_month: i64,
    pub finances: FinanceSummary,
    /// Seats taken over seats offered for upcoming sessions with a capacity, rounded percentage
    pub upcoming_fill_rate: Option<i64>,
}

/// Seats taken over seats offered, ignoring sessions without a capacity.
pub fn fill_rate(sessions: &[UpcomingSession]) -> Option<i64> {
    let (taken, offered) = sessions
        .iter()
        .filter_map(|s| s.capacity_max.filter(|c| *c > 0).map(|c| (s.enrolled_count, c as i64)))
        .fold((0i64, 0i64), |(t, o), (taken, cap)| (t + taken.min(cap), o + cap));

    (offered > 0).then(|| ((taken as f64 / offered as f64) * 100.0).round() as i64)
}
