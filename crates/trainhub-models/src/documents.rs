//! Generated documents and bulk document jobs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{DocumentJobId, OrganizationId, SessionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Convention,
    Contract,
    Convocation,
    Program,
    Terms,
    PrivacyPolicy,
    SessionReport,
    AttendanceCertificate,
}

impl DocumentKind {
    /// Kinds rendered once per enrollment rather than once per session.
    pub fn is_per_enrollment(&self) -> bool {
        matches!(
            self,
            Self::Contract | Self::Convocation | Self::AttendanceCertificate
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Convention => "convention",
            Self::Contract => "contract",
            Self::Convocation => "convocation",
            Self::Program => "program",
            Self::Terms => "terms",
            Self::PrivacyPolicy => "privacy_policy",
            Self::SessionReport => "session_report",
            Self::AttendanceCertificate => "attendance_certificate",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "convention" => Self::Convention,
            "contract" => Self::Contract,
            "convocation" => Self::Convocation,
            "program" => Self::Program,
            "terms" => Self::Terms,
            "privacy_policy" => Self::PrivacyPolicy,
            "session_report" => Self::SessionReport,
            "attendance_certificate" => Self::AttendanceCertificate,
            other => return Err(format!("Unknown document kind: {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::En => "en",
        }
    }

    /// Stored codes are trusted; anything unknown falls back to French.
    pub fn from_code(code: &str) -> Self {
        match code {
            "en" => Self::En,
            _ => Self::Fr,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Pdf,
    Html,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct DocumentQuery {
    #[serde(default)]
    pub format: DocumentFormat,
    #[serde(default)]
    pub language: Language,
    /// Program to render for `program` documents; defaults to the first linked program
    pub program_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_job_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentJobKind {
    ConventionsContracts,
    Convocations,
    ConvocationEmails,
}

impl DocumentJobKind {
    pub fn archive_prefix(&self) -> &'static str {
        match self {
            Self::ConventionsContracts => "conventions_contrats",
            Self::Convocations | Self::ConvocationEmails => "convocations",
        }
    }

    pub fn produces_archive(&self) -> bool {
        !matches!(self, Self::ConvocationEmails)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConventionsContracts => "conventions_contracts",
            Self::Convocations => "convocations",
            Self::ConvocationEmails => "convocation_emails",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl DocumentJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DocumentJob {
    pub id: DocumentJobId,
    pub organization_id: OrganizationId,
    pub session_id: SessionId,
    pub kind: DocumentJobKind,
    pub language: String,
    pub status: DocumentJobStatus,
    pub current: i32,
    pub total: i32,
    pub success_count: i32,
    pub error_count: i32,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub archive_key: Option<String>,
    pub file_name: Option<String>,
    /// SHA-256 of the archive, hex encoded
    pub checksum: Option<String>,
    pub error: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DocumentJob {
    pub fn percentage(&self) -> i64 {
        job_percentage(self.current, self.total)
    }
}

/// Job plus its computed completion percentage.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DocumentJobResponse {
    #[serde(flatten)]
    pub job: DocumentJob,
    pub percentage: i64,
}

impl From<DocumentJob> for DocumentJobResponse {
    fn from(job: DocumentJob) -> Self {
        let percentage = job.percentage();
        Self { job, percentage }
    }
}

pub fn job_percentage(current: i32, total: i32) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((current.min(total) as f64 / total as f64) * 100.0).round() as i64
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkDocumentsDto {
    pub kind: BulkDocumentsKind,
    #[serde(default)]
    pub language: Language,
}

/// Archive kinds that can be requested through the bulk endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BulkDocumentsKind {
    ConventionsContracts,
    Convocations,
}

impl From<BulkDocumentsKind> for DocumentJobKind {
    fn from(kind: BulkDocumentsKind) -> Self {
        match kind {
            BulkDocumentsKind::ConventionsContracts => Self::ConventionsContracts,
            BulkDocumentsKind::Convocations => Self::Convocations,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct SendEmailsDto {
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailSentResponse {
    pub message: String,
    pub recipient: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_scope() {
        assert!(DocumentKind::Contract.is_per_enrollment());
        assert!(DocumentKind::AttendanceCertificate.is_per_enrollment());
        assert!(!DocumentKind::Convention.is_per_enrollment());
        assert!(!DocumentKind::Terms.is_per_enrollment());
    }

    #[test]
    fn test_document_kind_from_path_segment() {
        assert_eq!(
            "privacy_policy".parse::<DocumentKind>(),
            Ok(DocumentKind::PrivacyPolicy)
        );
        assert!("invoice".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn test_job_percentage() {
        assert_eq!(job_percentage(0, 0), 0);
        assert_eq!(job_percentage(1, 3), 33);
        assert_eq!(job_percentage(3, 3), 100);
        assert_eq!(job_percentage(5, 3), 100);
    }

    #[test]
    fn test_bulk_dto_defaults_to_french() {
        let dto: BulkDocumentsDto = serde_json::from_str(r#"{"kind":"convocations"}"#).unwrap();
        assert_eq!(dto.language, Language::Fr);
        assert_eq!(DocumentJobKind::from(dto.kind), DocumentJobKind::Convocations);
    }
}
