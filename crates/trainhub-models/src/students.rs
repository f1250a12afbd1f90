//! Learners.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::serde::{deserialize_optional_string, deserialize_optional_uuid};
use trainhub_core::{PaginationMeta, PaginationParams};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{OrganizationId, StudentId};
use crate::value_types::Email;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "student_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub organization_id: OrganizationId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub student_number: Option<String>,
    pub company_name: Option<String>,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Condensed learner info attached to enrollment and report rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentSummary {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub email: Option<Email>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 50))]
    pub student_number: Option<String>,
    #[validate(length(max = 200))]
    pub company_name: Option<String>,
    pub status: Option<StudentStatus>,
    /// Required for system admins; ignored for everyone else
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub email: Option<Email>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 50))]
    pub student_number: Option<String>,
    #[validate(length(max = 200))]
    pub company_name: Option<String>,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct StudentFilterParams {
    /// Matches first name, last name or email
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    pub status: Option<StudentStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub organization_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: PaginationMeta,
}
