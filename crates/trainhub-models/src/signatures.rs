//! Signature requests sent by email for generated conventions and contracts.
//!
//! A request carries a random token; whoever holds the link can read the
//! document and sign or decline it until the request expires.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::serde::deserialize_optional_uuid;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::documents::{DocumentKind, Language};
use crate::ids::{EnrollmentId, OrganizationId, SessionId, SignatureRequestId, UserId};
use crate::value_types::Email;

pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "signature_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    Signed,
    Declined,
    Cancelled,
    Expired,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

/// Documents that can be sent for signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "signature_document", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SignatureDocument {
    Convention,
    Contract,
}

impl From<SignatureDocument> for DocumentKind {
    fn from(document: SignatureDocument) -> Self {
        match document {
            SignatureDocument::Convention => DocumentKind::Convention,
            SignatureDocument::Contract => DocumentKind::Contract,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "signature_recipient_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    #[default]
    Student,
    Funder,
    Teacher,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SignatureRequest {
    pub id: SignatureRequestId,
    pub organization_id: OrganizationId,
    pub session_id: SessionId,
    pub enrollment_id: EnrollmentId,
    pub document: SignatureDocument,
    pub language: String,
    pub recipient_type: RecipientType,
    pub recipient_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub message: Option<String>,
    /// Only ever sent to the recipient
    #[serde(skip_serializing)]
    pub token: String,
    pub status: SignatureStatus,
    pub expires_at: DateTime<Utc>,
    pub signer_name: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub reminder_count: i32,
    pub last_reminder_at: Option<DateTime<Utc>>,
    pub requested_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SignatureRequest {
    /// Status as seen at `now`: a pending request past its deadline is
    /// expired even before the row is updated.
    pub fn status_at(&self, now: DateTime<Utc>) -> SignatureStatus {
        if self.status == SignatureStatus::Pending && self.expires_at <= now {
            SignatureStatus::Expired
        } else {
            self.status
        }
    }

    pub fn language(&self) -> Language {
        Language::from_code(&self.language)
    }
}

/// What the holder of a signing link sees.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicSignatureRequest {
    pub id: SignatureRequestId,
    pub document: SignatureDocument,
    pub status: SignatureStatus,
    pub recipient_name: String,
    pub subject: String,
    pub message: Option<String>,
    pub organization_name: String,
    pub session_name: String,
    pub formation_name: String,
    pub expires_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
}

fn default_validity() -> i64 {
    DEFAULT_VALIDITY_DAYS
}

/// Recipient fields default to the enrolled learner.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSignatureRequestDto {
    pub document: SignatureDocument,
    #[serde(default)]
    pub recipient_type: RecipientType,
    #[validate(length(min = 1, max = 200))]
    pub recipient_name: Option<String>,
    pub recipient_email: Option<Email>,
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    #[serde(default = "default_validity")]
    #[validate(range(min = 1, max = 90, message = "Validity must be between 1 and 90 days"))]
    pub expires_in_days: i64,
    #[serde(default)]
    pub language: Language,
}

/// One request per non-cancelled learner of the session, sent to the
/// learner's own address.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkSignatureRequestDto {
    pub document: SignatureDocument,
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    #[serde(default = "default_validity")]
    #[validate(range(min = 1, max = 90, message = "Validity must be between 1 and 90 days"))]
    pub expires_in_days: i64,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkippedSignature {
    pub enrollment_id: EnrollmentId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkSignatureResponse {
    pub total: usize,
    pub created: Vec<SignatureRequest>,
    pub skipped: Vec<SkippedSignature>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignDocumentDto {
    #[validate(length(min = 1, max = 200, message = "Signer name is required"))]
    pub signer_name: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct DeclineSignatureDto {
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SignatureFilterParams {
    pub status: Option<SignatureStatus>,
    pub recipient_type: Option<RecipientType>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub session_id: Option<Uuid>,
}

/// Deadline for a request created at `now`.
pub fn expiry_from(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}
