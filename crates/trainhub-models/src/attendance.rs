//! Attendance per slot and learner.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::serde::deserialize_optional_uuid;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{AttendanceId, SlotId, StudentId, UserId};
use crate::slots::TimeSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    /// Late arrivals count as attended.
    pub fn counts_as_present(&self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub slot_id: SlotId,
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub recorded_by: Option<UserId>,
    pub recorded_at: DateTime<Utc>,
}

/// Attendance row joined with its slot and learner, for session listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceEntry {
    pub id: AttendanceId,
    pub slot_id: SlotId,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttendanceMark {
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordAttendanceDto {
    #[validate(length(min = 1, max = 500), nested)]
    pub records: Vec<AttendanceMark>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub slot_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceTotals {
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub excused: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StudentAttendanceStats {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    /// Present plus late
    pub present: i64,
    pub total: i64,
    /// Rounded percentage, 0 when nothing was recorded
    pub rate: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceStats {
    pub totals: AttendanceTotals,
    pub overall_rate: i64,
    pub students: Vec<StudentAttendanceStats>,
}

/// `round(attended / total × 100)`, or 0 for an empty total.
pub fn attendance_rate(attended: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((attended as f64 / total as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_rate() {
        assert_eq!(attendance_rate(0, 0), 0);
        assert_eq!(attendance_rate(2, 3), 67);
        assert_eq!(attendance_rate(1, 3), 33);
        assert_eq!(attendance_rate(4, 4), 100);
    }

    #[test]
    fn test_late_counts_as_present() {
        assert!(AttendanceStatus::Late.counts_as_present());
        assert!(AttendanceStatus::Present.counts_as_present());
        assert!(!AttendanceStatus::Excused.counts_as_present());
        assert!(!AttendanceStatus::Absent.counts_as_present());
    }

    #[test]
    fn test_record_dto_requires_records() {
        let dto = RecordAttendanceDto { records: vec![] };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_record_dto_validates_each_mark() {
        let mark = |notes: Option<String>| AttendanceMark {
            student_id: StudentId::from_uuid(Uuid::new_v4()),
            status: AttendanceStatus::Present,
            notes,
        };

        let dto = RecordAttendanceDto {
            records: vec![mark(None), mark(Some("Arrivée à 9h".to_string()))],
        };
        assert!(dto.validate().is_ok());

        let dto = RecordAttendanceDto {
            records: vec![mark(Some("x".repeat(1001)))],
        };
        assert!(dto.validate().is_err());
    }
}
