//! Session slots: the half-day or full-day time blocks of a session.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{SessionId, SlotId, UserId};
use crate::time_format::{deserialize_optional_time, deserialize_time};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "time_slot", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    FullDay,
}

/// Which half-days a generation template produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlotType {
    Morning,
    Afternoon,
    #[default]
    Both,
    /// Generated as a morning and an afternoon slot
    FullDay,
}

impl TimeSlotType {
    pub fn includes_morning(&self) -> bool {
        !matches!(self, Self::Afternoon)
    }

    pub fn includes_afternoon(&self) -> bool {
        !matches!(self, Self::Morning)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SessionSlot {
    pub id: SlotId,
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "12:00:00")]
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub teacher_id: Option<UserId>,
    pub capacity_max: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_morning_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
}

fn default_morning_end() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()
}

fn default_afternoon_start() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default()
}

fn default_afternoon_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default()
}

fn default_true() -> bool {
    true
}

/// Template for generating a session's slots between two dates.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateSlotsDto {
    #[serde(default)]
    pub time_slot_type: TimeSlotType,
    #[serde(default = "default_morning_start", deserialize_with = "deserialize_time")]
    #[schema(value_type = String, example = "09:00")]
    pub morning_start: NaiveTime,
    #[serde(default = "default_morning_end", deserialize_with = "deserialize_time")]
    #[schema(value_type = String, example = "12:00")]
    pub morning_end: NaiveTime,
    #[serde(default = "default_afternoon_start", deserialize_with = "deserialize_time")]
    #[schema(value_type = String, example = "14:00")]
    pub afternoon_start: NaiveTime,
    #[serde(default = "default_afternoon_end", deserialize_with = "deserialize_time")]
    #[schema(value_type = String, example = "17:00")]
    pub afternoon_end: NaiveTime,
    #[serde(default = "default_true")]
    pub skip_weekends: bool,
    pub location: Option<String>,
    pub teacher_id: Option<UserId>,
    #[validate(range(min = 1, message = "Capacity must be greater than 0"))]
    pub capacity_max: Option<i32>,
    /// Defaults to the session start date
    pub start_date: Option<NaiveDate>,
    /// Defaults to the session end date
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub replace_existing: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateSlotsResponse {
    pub created: usize,
    pub skipped: usize,
    pub slots: Vec<SessionSlot>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSlotDto {
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    #[serde(deserialize_with = "deserialize_time")]
    #[schema(value_type = String, example = "09:00")]
    pub start_time: NaiveTime,
    #[serde(deserialize_with = "deserialize_time")]
    #[schema(value_type = String, example = "12:00")]
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub teacher_id: Option<UserId>,
    #[validate(range(min = 1, message = "Capacity must be greater than 0"))]
    pub capacity_max: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSlotDto {
    pub date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    #[schema(value_type = Option<String>, example = "09:00")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    #[schema(value_type = Option<String>, example = "12:00")]
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub teacher_id: Option<UserId>,
    #[validate(range(min = 1, message = "Capacity must be greater than 0"))]
    pub capacity_max: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteSlotsResponse {
    pub deleted: u64,
}
