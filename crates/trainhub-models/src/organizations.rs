//! Organizations: the training bodies that own every other record and whose
//! identity appears on generated documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::{PaginationMeta, PaginationParams};
use trainhub_core::serde::deserialize_optional_string;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::OrganizationId;

pub const DEFAULT_CURRENCY: &str = "XOF";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub siret: Option<String>,
    pub vat_number: Option<String>,
    pub director_name: Option<String>,
    pub currency: String,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrganizationDto {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub siret: Option<String>,
    #[validate(length(max = 50))]
    pub vat_number: Option<String>,
    #[validate(length(max = 200))]
    pub director_name: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrganizationDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub siret: Option<String>,
    #[validate(length(max = 50))]
    pub vat_number: Option<String>,
    #[validate(length(max = 200))]
    pub director_name: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct OrganizationFilterParams {
    /// Case-insensitive match on the name
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedOrganizationsResponse {
    pub data: Vec<Organization>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_organization_validation() {
        let dto = CreateOrganizationDto {
            name: "Institut Formation Plus".to_string(),
            address: Some("12 rue des Écoles".to_string()),
            city: Some("Abidjan".to_string()),
            phone: None,
            email: Some("contact@ifp.test".to_string()),
            siret: Some("123 456 789 00012".to_string()),
            vat_number: None,
            director_name: Some("Awa Koné".to_string()),
            currency: Some("XOF".to_string()),
            logo_url: None,
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_organization_rejects_bad_currency_and_email() {
        let dto = CreateOrganizationDto {
            name: "IFP".to_string(),
            address: None,
            city: None,
            phone: None,
            email: Some("nope".to_string()),
            siret: None,
            vat_number: None,
            director_name: None,
            currency: Some("EURO".to_string()),
            logo_url: None,
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("currency"));
    }
}
