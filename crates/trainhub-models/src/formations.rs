//! Training catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::serde::{
    deserialize_optional_bool, deserialize_optional_string, deserialize_optional_uuid,
};
use trainhub_core::{PaginationMeta, PaginationParams};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{FormationId, OrganizationId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Formation {
    pub id: FormationId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub duration_hours: Option<i32>,
    pub price: f64,
    pub currency: String,
    pub objectives: Option<String>,
    pub prerequisites: Option<String>,
    pub target_audience: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FormationSummary {
    pub id: FormationId,
    pub name: String,
    pub code: Option<String>,
    pub duration_hours: Option<i32>,
    pub price: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFormationDto {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration_hours: Option<i32>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub objectives: Option<String>,
    pub prerequisites: Option<String>,
    pub target_audience: Option<String>,
    pub is_active: Option<bool>,
    /// Required for system admins; ignored for everyone else
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFormationDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration_hours: Option<i32>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub objectives: Option<String>,
    pub prerequisites: Option<String>,
    pub target_audience: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Hash, Deserialize, IntoParams, ToSchema)]
pub struct FormationFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub organization_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedFormationsResponse {
    pub data: Vec<Formation>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto() -> CreateFormationDto {
        CreateFormationDto {
            name: "Management d'équipe".to_string(),
            code: Some("MGT-01".to_string()),
            description: None,
            duration_hours: Some(21),
            price: Some(450_000.0),
            currency: None,
            objectives: None,
            prerequisites: None,
            target_audience: None,
            is_active: None,
            organization_id: None,
        }
    }

    #[test]
    fn test_valid_formation() {
        assert!(dto().validate().is_ok());
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let bad = CreateFormationDto {
            price: Some(-1.0),
            ..dto()
        };
        assert!(bad.validate().unwrap_err().field_errors().contains_key("price"));
    }

    #[test]
    fn test_name_length_bounds() {
        let long = CreateFormationDto {
            name: "x".repeat(201),
            ..dto()
        };
        assert!(long.validate().is_err());
    }
}
