//! Payments against enrollments, and invoices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::ids::{EnrollmentId, InvoiceId, OrganizationId, PaymentId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    MobileMoney,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::MobileMoney => "mobile_money",
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "mobile_money_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MobileMoneyProvider {
    Mtn,
    Orange,
    Airtel,
    Wave,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: PaymentId,
    pub organization_id: OrganizationId,
    pub enrollment_id: EnrollmentId,
    pub amount: f64,
    pub method: PaymentMethod,
    pub provider: Option<MobileMoneyProvider>,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

fn validate_provider(dto: &CreatePaymentDto) -> Result<(), ValidationError> {
    match (dto.method, dto.provider) {
        (PaymentMethod::MobileMoney, None) => {
            let mut err = ValidationError::new("provider_required");
            err.message = Some("A provider is required for mobile money payments".into());
            Err(err)
        }
        (PaymentMethod::MobileMoney, Some(_)) | (_, None) => Ok(()),
        (_, Some(_)) => {
            let mut err = ValidationError::new("provider_forbidden");
            err.message = Some("A provider is only allowed for mobile money payments".into());
            Err(err)
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_provider"))]
pub struct CreatePaymentDto {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    pub method: PaymentMethod,
    pub provider: Option<MobileMoneyProvider>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    /// Defaults to now
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: InvoiceId,
    pub organization_id: OrganizationId,
    pub enrollment_id: EnrollmentId,
    /// `FAC-<year>-<sequence>`
    pub number: String,
    pub year: i32,
    pub sequence: i32,
    pub amount: f64,
    pub issued_at: DateTime<Utc>,
}

impl Invoice {
    pub fn format_number(year: i32, sequence: i32) -> String {
        format!("FAC-{}-{:05}", year, sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(method: PaymentMethod, provider: Option<MobileMoneyProvider>) -> CreatePaymentDto {
        CreatePaymentDto {
            amount: 25_000.0,
            method,
            provider,
            reference: None,
            paid_at: None,
            notes: None,
        }
    }

    #[test]
    fn test_mobile_money_requires_provider() {
        assert!(dto(PaymentMethod::MobileMoney, None).validate().is_err());
        assert!(
            dto(PaymentMethod::MobileMoney, Some(MobileMoneyProvider::Wave))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_provider_forbidden_for_other_methods() {
        assert!(
            dto(PaymentMethod::Cash, Some(MobileMoneyProvider::Mtn))
                .validate()
                .is_err()
        );
        assert!(dto(PaymentMethod::BankTransfer, None).validate().is_ok());
    }

    #[test]
    fn test_amount_must_be_positive() {
        let zero = CreatePaymentDto {
            amount: 0.0,
            ..dto(PaymentMethod::Cash, None)
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(Invoice::format_number(2025, 7), "FAC-2025-00007");
        assert_eq!(Invoice::format_number(2026, 12345), "FAC-2026-12345");
    }
}
