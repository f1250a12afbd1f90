//! Training sessions: a scheduled run of a formation with dates, staff and
//! capacity.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::serde::{deserialize_optional_string, deserialize_optional_uuid};
use trainhub_core::{PaginationMeta, PaginationParams};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::formations::FormationSummary;
use crate::ids::{FormationId, OrganizationId, ProgramId, SessionId, UserId};
use crate::time_format::{deserialize_optional_date, deserialize_optional_time};

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Planned,
    Ongoing,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Completed and cancelled sessions are closed to new enrollments.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Session {
    pub id: SessionId,
    pub organization_id: OrganizationId,
    pub formation_id: FormationId,
    pub name: String,
    pub code: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[schema(value_type = Option<String>, example = "09:00:00")]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "17:00:00")]
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub capacity_max: Option<i32>,
    pub teacher_id: Option<UserId>,
    pub manager1_id: Option<UserId>,
    pub manager2_id: Option<UserId>,
    pub inter_entreprise: bool,
    pub sous_traitance: bool,
    pub timezone: String,
    pub price: Option<f64>,
    pub currency: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Whether new learners may still join: not closed and not already over.
    pub fn accepts_enrollments(&self, today: NaiveDate) -> bool {
        !self.status.is_closed() && self.end_date >= today
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// A session row in list responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SessionWithStats {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub session: Session,
    pub formation_name: String,
    pub enrolled_count: i64,
    /// `None` when the session has no capacity limit
    pub available_spots: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub formation: FormationSummary,
    pub program_ids: Vec<ProgramId>,
    pub enrolled_count: i64,
    pub available_spots: Option<i64>,
    pub slot_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessionDto {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 50))]
    pub code: Option<String>,
    pub formation_id: FormationId,
    #[serde(default)]
    pub program_ids: Vec<ProgramId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    #[schema(value_type = Option<String>, example = "09:00")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    #[schema(value_type = Option<String>, example = "17:00")]
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be greater than 0"))]
    pub capacity_max: Option<i32>,
    pub teacher_id: Option<UserId>,
    pub manager1_id: Option<UserId>,
    pub manager2_id: Option<UserId>,
    pub inter_entreprise: Option<bool>,
    pub sous_traitance: Option<bool>,
    #[validate(length(min = 1, max = 64))]
    pub timezone: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub status: Option<SessionStatus>,
    /// Required for system admins; ignored for everyone else
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSessionDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub code: Option<String>,
    pub formation_id: Option<FormationId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    #[schema(value_type = Option<String>, example = "09:00")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    #[schema(value_type = Option<String>, example = "17:00")]
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be greater than 0"))]
    pub capacity_max: Option<i32>,
    pub teacher_id: Option<UserId>,
    pub manager1_id: Option<UserId>,
    pub manager2_id: Option<UserId>,
    pub inter_entreprise: Option<bool>,
    pub sous_traitance: Option<bool>,
    #[validate(length(min = 1, max = 64))]
    pub timezone: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSessionStatusDto {
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetSessionProgramsDto {
    pub program_ids: Vec<ProgramId>,
}

#[derive(Debug, Clone, Hash, Deserialize, IntoParams, ToSchema)]
pub struct SessionFilterParams {
    pub status: Option<SessionStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub formation_id: Option<Uuid>,
    /// Sessions ending on or after this date
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    /// Sessions starting on or before this date
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub organization_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedSessionsResponse {
    pub data: Vec<SessionWithStats>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionCapacity {
    pub capacity_max: Option<i32>,
    pub active_enrollments: i64,
    pub available_spots: Option<i64>,
    pub is_full: bool,
}

impl SessionCapacity {
    /// Capacity is only enforced when `capacity_max` is a positive number.
    pub fn compute(capacity_max: Option<i32>, active_enrollments: i64) -> Self {
        match capacity_max.filter(|max| *max > 0) {
            Some(max) => {
                let max = i64::from(max);
                Self {
                    capacity_max,
                    active_enrollments,
                    available_spots: Some((max - active_enrollments).max(0)),
                    is_full: active_enrollments >= max,
                }
            }
            None => Self {
                capacity_max,
                active_enrollments,
                available_spots: None,
                is_full: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_without_limit_is_never_full() {
        let cap = SessionCapacity::compute(None, 500);
        assert!(!cap.is_full);
        assert_eq!(cap.available_spots, None);
    }

    #[test]
    fn test_capacity_counts_remaining_spots() {
        let cap = SessionCapacity::compute(Some(12), 9);
        assert_eq!(cap.available_spots, Some(3));
        assert!(!cap.is_full);

        let full = SessionCapacity::compute(Some(12), 12);
        assert_eq!(full.available_spots, Some(0));
        assert!(full.is_full);

        let over = SessionCapacity::compute(Some(12), 14);
        assert_eq!(over.available_spots, Some(0));
        assert!(over.is_full);
    }

    #[test]
    fn test_closed_statuses() {
        assert!(SessionStatus::Completed.is_closed());
        assert!(SessionStatus::Cancelled.is_closed());
        assert!(!SessionStatus::Planned.is_closed());
        assert!(!SessionStatus::Ongoing.is_closed());
    }

    #[test]
    fn test_create_session_parses_short_times() {
        let dto: CreateSessionDto = serde_json::from_str(
            r#"{
                "name": "Session mars",
                "formation_id": "12345678-1234-1234-1234-123456789abc",
                "start_date": "2025-03-10",
                "end_date": "2025-03-14",
                "start_time": "09:00",
                "end_time": "17:00",
                "capacity_max": 0
            }"#,
        )
        .unwrap();
        assert_eq!(dto.start_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert!(dto.program_ids.is_empty());
        assert!(dto.validate().unwrap_err().field_errors().contains_key("capacity_max"));
    }
}
