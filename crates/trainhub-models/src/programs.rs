//! Pedagogical programs: an ordered list of modules printed on the program
//! document and linked to sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use trainhub_core::serde::{deserialize_optional_string, deserialize_optional_uuid};
use trainhub_core::{PaginationMeta, PaginationParams};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{OrganizationId, ProgramId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProgramModule {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub duration_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Program {
    pub id: ProgramId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Vec<ProgramModule>)]
    pub content: Json<Vec<ProgramModule>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Program {
    pub fn total_hours(&self) -> f64 {
        self.content.iter().filter_map(|m| m.duration_hours).sum()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProgramDto {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub content: Vec<ProgramModule>,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProgramDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(nested)]
    pub content: Option<Vec<ProgramModule>>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ProgramFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub organization_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedProgramsResponse {
    pub data: Vec<Program>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_module_validation() {
        let dto = CreateProgramDto {
            name: "Programme Excel".to_string(),
            code: None,
            description: None,
            content: vec![ProgramModule {
                title: String::new(),
                description: None,
                duration_hours: Some(3.5),
            }],
            organization_id: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_content_defaults_to_empty() {
        let dto: CreateProgramDto = serde_json::from_str(r#"{"name":"Programme"}"#).unwrap();
        assert!(dto.content.is_empty());
        assert!(dto.validate().is_ok());
    }
}
