use std::collections::{BTreeMap, HashSet};

use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};
use trainhub_core::AppError;
use trainhub_models::{OrganizationId, SessionId, SlotId, StudentId, UserId};
use uuid::Uuid;

use crate::modules::sessions::service::SessionService;
use crate::modules::slots::service::SlotService;

use super::model::{
    AttendanceEntry, AttendanceFilterParams, AttendanceRecord, AttendanceStats, AttendanceStatus,
    AttendanceTotals, RecordAttendanceDto, StudentAttendanceStats, attendance_rate,
};

/// One enrolled learner with one of their attendance marks, if any.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceStatRow {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub status: Option<AttendanceStatus>,
}

/// Aggregates marks per status and per learner. Learners without any mark
/// are listed with a zero total.
pub fn compute_stats(rows: &[AttendanceStatRow]) -> AttendanceStats {
    let mut totals = AttendanceTotals::default();
    let mut per_student: BTreeMap<(String, String, StudentId), (i64, i64)> = BTreeMap::new();

    for row in rows {
        let entry = per_student
            .entry((row.last_name.clone(), row.first_name.clone(), row.student_id))
            .or_default();

        let Some(status) = row.status else { continue };

        match status {
            AttendanceStatus::Present => totals.present += 1,
            AttendanceStatus::Absent => totals.absent += 1,
            AttendanceStatus::Late => totals.late += 1,
            AttendanceStatus::Excused => totals.excused += 1,
        }
        totals.total += 1;

        entry.1 += 1;
        if status.counts_as_present() {
            entry.0 += 1;
        }
    }

    let students = per_student
        .into_iter()
        .map(|((last_name, first_name, student_id), (present, total))| StudentAttendanceStats {
            student_id,
            first_name,
            last_name,
            present,
            total,
            rate: attendance_rate(present, total),
        })
        .collect();

    AttendanceStats {
        overall_rate: attendance_rate(totals.present + totals.late, totals.total),
        totals,
        students,
    }
}

pub struct AttendanceService;

impl AttendanceService {
    /// Upserts one mark per learner for the slot, all or nothing.
    #[instrument(skip(db, dto), fields(slot.id = %slot_id, records = dto.records.len()))]
    pub async fn record_attendance(
        db: &PgPool,
        slot_id: SlotId,
        scope: Option<OrganizationId>,
        recorded_by: Option<UserId>,
        dto: RecordAttendanceDto,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let (slot, _session) = SlotService::load_slot(db, slot_id, scope).await?;

        let student_ids: Vec<Uuid> = dto
            .records
            .iter()
            .map(|r| r.student_id.into_inner())
            .collect();

        let enrolled: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT student_id FROM enrollments
            WHERE session_id = $1 AND student_id = ANY($2) AND status <> 'cancelled'
            "#,
        )
        .bind(slot.session_id.into_inner())
        .bind(&student_ids)
        .fetch_all(db)
        .await?
        .into_iter()
        .collect();

        if let Some(missing) = student_ids.iter().find(|id| !enrolled.contains(id)) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student {} is not enrolled in this session",
                missing
            )));
        }

        let mut tx = db.begin().await?;
        let mut records = Vec::with_capacity(dto.records.len());

        for mark in dto.records {
            let record = sqlx::query_as::<_, AttendanceRecord>(
                r#"
                INSERT INTO attendance (slot_id, student_id, status, notes, recorded_by)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (slot_id, student_id) DO UPDATE SET
                    status = EXCLUDED.status,
                    notes = EXCLUDED.notes,
                    recorded_by = EXCLUDED.recorded_by,
                    recorded_at = NOW()
                RETURNING *
                "#,
            )
            .bind(slot_id.into_inner())
            .bind(mark.student_id.into_inner())
            .bind(mark.status)
            .bind(mark.notes)
            .bind(recorded_by.map(|id| id.into_inner()))
            .fetch_one(&mut *tx)
            .await?;
            records.push(record);
        }

        tx.commit().await?;
        info!(count = records.len(), "Attendance recorded");

        Ok(records)
    }

    #[instrument(skip(db))]
    pub async fn get_slot_attendance(
        db: &PgPool,
        slot_id: SlotId,
        scope: Option<OrganizationId>,
    ) -> Result<Vec<AttendanceEntry>, AppError> {
        let (slot, _) = SlotService::load_slot(db, slot_id, scope).await?;

        Self::query_entries(db, slot.session_id, Some(slot_id.into_inner())).await
    }

    #[instrument(skip(db))]
    pub async fn get_session_attendance(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        filters: AttendanceFilterParams,
    ) -> Result<Vec<AttendanceEntry>, AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        Self::query_entries(db, session_id, filters.slot_id).await
    }

    async fn query_entries(
        db: &PgPool,
        session_id: SessionId,
        slot_id: Option<Uuid>,
    ) -> Result<Vec<AttendanceEntry>, AppError> {
        let entries = sqlx::query_as::<_, AttendanceEntry>(
            r#"
            SELECT
                a.id, a.slot_id, sl.date, sl.time_slot, a.student_id,
                st.first_name, st.last_name, a.status, a.notes, a.recorded_at
            FROM attendance a
            INNER JOIN session_slots sl ON sl.id = a.slot_id
            INNER JOIN students st ON st.id = a.student_id
            WHERE sl.session_id = $1
              AND ($2::uuid IS NULL OR a.slot_id = $2)
            ORDER BY sl.date, sl.start_time, st.last_name, st.first_name
            "#,
        )
        .bind(session_id.into_inner())
        .bind(slot_id)
        .fetch_all(db)
        .await?;

        Ok(entries)
    }

    /// Marks of every non-cancelled learner of the session, one row per mark
    /// and one empty row for learners without marks.
    pub async fn stat_rows(
        db: &PgPool,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceStatRow>, AppError> {
        let rows = sqlx::query_as::<_, AttendanceStatRow>(
            r#"
            SELECT st.id AS student_id, st.first_name, st.last_name, a.status
            FROM enrollments e
            INNER JOIN students st ON st.id = e.student_id
            LEFT JOIN session_slots sl ON sl.session_id = e.session_id
            LEFT JOIN attendance a ON a.slot_id = sl.id AND a.student_id = e.student_id
            WHERE e.session_id = $1 AND e.status <> 'cancelled'
            "#,
        )
        .bind(session_id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(db))]
    pub async fn get_stats(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<AttendanceStats, AppError> {
        SessionService::load_session(db, session_id, scope).await?;
        let rows = Self::stat_rows(db, session_id).await?;
        Ok(compute_stats(&rows))
    }
}
