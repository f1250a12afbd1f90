use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::enrollments::{EnrollmentStatus, PaymentStatus};
use trainhub_models::grades::{Grade, GradeStats};
use trainhub_models::{EnrollmentId, OrganizationId, SessionId, StudentId};

use crate::modules::attendance::service::{AttendanceService, compute_stats};
use crate::modules::sessions::service::SessionService;

use super::model::{
    DashboardReport, EnrollmentCounts, FinanceSummary, FormationSummary, SessionReport,
    StudentReportCsvRow, StudentReportRow, UpcomingSession, fill_rate,
};

/// Horizon of the dashboard's upcoming sessions.
const UPCOMING_DAYS: u64 = 30;

#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentReportRow {
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
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn enrollment_counts(rows: &[EnrollmentReportRow]) -> EnrollmentCounts {
    EnrollmentCounts {
        total: rows.len() as i64,
        active: rows.iter().filter(|r| r.status.holds_seat()).count() as i64,
        completed: rows
            .iter()
            .filter(|r| r.status == EnrollmentStatus::Completed)
            .count() as i64,
    }
}

/// Revenue and payments of the non-cancelled enrollments.
pub fn finances(rows: &[EnrollmentReportRow]) -> FinanceSummary {
    let (revenue, paid) = rows
        .iter()
        .filter(|r| r.status != EnrollmentStatus::Cancelled)
        .fold((0.0, 0.0), |(t, p), r| (t + r.total_amount, p + r.paid_amount));
    FinanceSummary::new(revenue, paid)
}

/// Mean grade on a /20 scale per learner.
pub fn average_grades(grades: &[Grade]) -> HashMap<StudentId, f64> {
    let mut sums: HashMap<StudentId, (f64, usize)> = HashMap::new();
    for grade in grades {
        let entry = sums.entry(grade.student_id).or_default();
        entry.0 += grade.percentage() / 5.0;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(student, (sum, count))| (student, round2(sum / count as f64)))
        .collect()
}

pub struct ReportService;

impl ReportService {
    /// Assembles the full report of a session. Shared by the report
    /// endpoints and the session report document.
    #[instrument(skip(db))]
    pub async fn build_session_report(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<SessionReport, AppError> {
        let session = SessionService::load_session(db, session_id, scope).await?;

        let formation = sqlx::query_as::<_, FormationSummary>(
            "SELECT id, name, code, duration_hours, price FROM formations WHERE id = $1",
        )
        .bind(session.formation_id.into_inner())
        .fetch_one(db)
        .await?;

        let rows = sqlx::query_as::<_, EnrollmentReportRow>(
            r#"
            SELECT
                e.id AS enrollment_id, st.id AS student_id, st.first_name, st.last_name,
                st.email, e.enrollment_date, e.status, e.payment_status,
                e.total_amount, e.paid_amount
            FROM enrollments e
            INNER JOIN students st ON st.id = e.student_id
            WHERE e.session_id = $1
            ORDER BY st.last_name, st.first_name
            "#,
        )
        .bind(session_id.into_inner())
        .fetch_all(db)
        .await?;

        let grades = sqlx::query_as::<_, Grade>("SELECT * FROM grades WHERE session_id = $1")
            .bind(session_id.into_inner())
            .fetch_all(db)
            .await?;

        let attendance = compute_stats(&AttendanceService::stat_rows(db, session_id).await?);
        let attendance_by_student: HashMap<StudentId, i64> = attendance
            .students
            .iter()
            .map(|s| (s.student_id, s.rate))
            .collect();

        let grade_stats = GradeStats::from_grades(&grades);
        let grade_by_student = average_grades(&grades);

        let students = rows
            .iter()
            .map(|row| StudentReportRow {
                enrollment_id: row.enrollment_id,
                student_id: row.student_id,
                first_name: row.first_name.clone(),
                last_name: row.last_name.clone(),
                email: row.email.clone(),
                enrollment_date: row.enrollment_date,
                status: row.status,
                payment_status: row.payment_status,
                total_amount: row.total_amount,
                paid_amount: row.paid_amount,
                attendance_rate: attendance_by_student
                    .get(&row.student_id)
                    .copied()
                    .unwrap_or(0),
                average_grade: grade_by_student.get(&row.student_id).copied(),
            })
            .collect();

        let has_grades = grade_stats.count > 0;

        Ok(SessionReport {
            session,
            formation,
            enrollments: enrollment_counts(&rows),
            attendance_rate: attendance.overall_rate,
            average_grade: has_grades.then_some(grade_stats.average_on_20),
            average_percentage: has_grades.then_some(grade_stats.average_percentage),
            finances: finances(&rows),
            students,
        })
    }

    /// Per-learner rows of the session report as CSV.
    #[instrument(skip(db))]
    pub async fn export_session_csv(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<(String, Vec<u8>), AppError> {
        let report = Self::build_session_report(db, session_id, scope).await?;
        let bytes = write_csv(&report)?;
        Ok((report.session.name, bytes))
    }

    #[instrument(skip(db))]
    pub async fn get_dashboard(
        db: &PgPool,
        organization_id: OrganizationId,
    ) -> Result<DashboardReport, AppError> {
        let org = organization_id.into_inner();
        let today = Utc::now().date_naive();
        let horizon = today
            .checked_add_days(Days::new(UPCOMING_DAYS))
            .unwrap_or(today);
        let month_start = today.with_day(1).unwrap_or(today);

        let sessions_by_status = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status::text, COUNT(*) FROM sessions
            WHERE organization_id = $1
            GROUP BY status
            "#,
        )
        .bind(org)
        .fetch_all(db)
        .await?
        .into_iter()
        .collect();

        let upcoming_sessions = sqlx::query_as::<_, UpcomingSession>(
            r#"
            SELECT
                s.id, s.name, s.start_date, s.end_date, s.capacity_max,
                (SELECT COUNT(*) FROM enrollments e
                    WHERE e.session_id = s.id AND e.status IN ('confirmed', 'pending')
                ) AS enrolled_count
            FROM sessions s
            WHERE s.organization_id = $1
              AND s.status <> 'cancelled'
              AND s.start_date BETWEEN $2 AND $3
            ORDER BY s.start_date, s.name
            "#,
        )
        .bind(org)
        .bind(today)
        .bind(horizon)
        .fetch_all(db)
        .await?;

        let active_students = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM students WHERE organization_id = $1 AND status = 'active'",
        )
        .bind(org)
        .fetch_one(db)
        .await?;

        let enrollments_this_month = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE organization_id = $1 AND enrollment_date >= $2
            "#,
        )
        .bind(org)
        .bind(month_start)
        .fetch_one(db)
        .await?;

        let (revenue, paid) = sqlx::query_as::<_, (f64, f64)>(
            r#"
            SELECT
                COALESCE(SUM(total_amount), 0)::float8,
                COALESCE(SUM(paid_amount), 0)::float8
            FROM enrollments
            WHERE organization_id = $1 AND status <> 'cancelled'
            "#,
        )
        .bind(org)
        .fetch_one(db)
        .await?;

        Ok(DashboardReport {
            sessions_by_status,
            upcoming_fill_rate: fill_rate(&upcoming_sessions),
            upcoming_sessions,
            active_students,
            enrollments_this_month,
            finances: FinanceSummary::new(revenue, paid),
        })
    }
}

pub fn write_csv(report: &SessionReport) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &report.students {
        writer.serialize(StudentReportCsvRow::from(row))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to write CSV: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use trainhub_models::grades::AssessmentType;
    use trainhub_models::{GradeId, OrganizationId};

    use super::*;

    fn row(status: EnrollmentStatus, total: f64, paid: f64) -> EnrollmentReportRow {
        EnrollmentReportRow {
            enrollment_id: EnrollmentId::new(),
            student_id: StudentId::new(),
            first_name: "Awa".to_string(),
            last_name: "Koné".to_string(),
            email: None,
            enrollment_date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            status,
            payment_status: PaymentStatus::from_amounts(paid, total),
            total_amount: total,
            paid_amount: paid,
        }
    }

    fn grade(student: StudentId, score: f64, max_score: f64) -> Grade {
        Grade {
            id: GradeId::new(),
            organization_id: OrganizationId::new(),
            session_id: SessionId::new(),
            student_id: student,
            subject: "Module 1".to_string(),
            assessment_type: AssessmentType::Exam,
            score,
            max_score,
            notes: None,
            graded_at: Utc::now(),
            teacher_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_and_finances_skip_cancelled_revenue() {
        let rows = vec![
            row(EnrollmentStatus::Confirmed, 1000.0, 400.0),
            row(EnrollmentStatus::Pending, 500.0, 0.0),
            row(EnrollmentStatus::Completed, 800.0, 800.0),
            row(EnrollmentStatus::Cancelled, 700.0, 100.0),
        ];

        assert_eq!(
            enrollment_counts(&rows),
            EnrollmentCounts {
                total: 4,
                active: 2,
                completed: 1
            }
        );

        let summary = finances(&rows);
        assert_eq!(summary.total_revenue, 2300.0);
        assert_eq!(summary.paid_amount, 1200.0);
        assert_eq!(summary.remaining, 1100.0);
    }

    #[test]
    fn test_average_grades_on_twenty() {
        let awa = StudentId::new();
        let ben = StudentId::new();
        let grades = vec![grade(awa, 15.0, 20.0), grade(awa, 80.0, 100.0), grade(ben, 5.0, 10.0)];

        let averages = average_grades(&grades);
        assert_eq!(averages[&awa], 15.5);
        assert_eq!(averages[&ben], 10.0);
    }
}
