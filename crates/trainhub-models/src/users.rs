//! Staff accounts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::permissions::roles;
use trainhub_core::serde::{deserialize_optional_bool, deserialize_optional_uuid};
use trainhub_core::{PaginationMeta, PaginationParams};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{OrganizationId, UserId};
use crate::value_types::Email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SystemAdmin,
    Admin,
    Manager,
    Trainer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemAdmin => roles::SYSTEM_ADMIN,
            Self::Admin => roles::ADMIN,
            Self::Manager => roles::MANAGER,
            Self::Trainer => roles::TRAINER,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub email: Email,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: UserRole,
    /// Required for system admins; ignored for everyone else
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub email: Option<Email>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserFilterParams {
    pub role: Option<UserRole>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    /// System admins only: restrict to one organization
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub organization_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<User>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_wire_format() {
        assert_eq!(
            serde_json::to_string(&UserRole::SystemAdmin).unwrap(),
            r#""system_admin""#
        );
        let role: UserRole = serde_json::from_str(r#""trainer""#).unwrap();
        assert_eq!(role, UserRole::Trainer);
        assert_eq!(role.as_str(), "trainer");
    }

    #[test]
    fn test_create_user_dto_validation() {
        let dto = CreateUserDto {
            first_name: "Koffi".to_string(),
            last_name: "Yao".to_string(),
            email: Email::new("koffi@acme.test").unwrap(),
            password: "short".to_string(),
            role: UserRole::Trainer,
            organization_id: None,
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: UserId::new(),
            organization_id: None,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: Email::new_unchecked("a@b.test"),
            password_hash: "$2b$secret".to_string(),
            role: UserRole::Admin,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$2b$secret"));
    }
}
