//! Evaluations recorded for learners of a session.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::serde::deserialize_optional_uuid;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::ids::{GradeId, OrganizationId, SessionId, StudentId, UserId};

pub const DEFAULT_MAX_SCORE: f64 = 20.0;

/// Kind of evaluation. Legacy labels are accepted on input.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "assessment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
    #[serde(alias = "preformation")]
    PreFormation,
    #[serde(alias = "a_chaud")]
    Hot,
    #[serde(alias = "a_froid")]
    Cold,
    #[serde(alias = "managers")]
    Manager,
    #[serde(alias = "intervenants")]
    Instructor,
    #[serde(alias = "financeurs")]
    Funder,
    Quiz,
    Exam,
    Project,
    #[serde(alias = "evaluation_generale")]
    Other,
}

impl AssessmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreFormation => "pre_formation",
            Self::Hot => "hot",
            Self::Cold => "cold",
            Self::Manager => "manager",
            Self::Instructor => "instructor",
            Self::Funder => "funder",
            Self::Quiz => "quiz",
            Self::Exam => "exam",
            Self::Project => "project",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Grade {
    pub id: GradeId,
    pub organization_id: OrganizationId,
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub subject: String,
    pub assessment_type: AssessmentType,
    pub score: f64,
    pub max_score: f64,
    pub notes: Option<String>,
    pub graded_at: DateTime<Utc>,
    pub teacher_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grade {
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.max_score)
    }
}

pub fn percentage(score: f64, max_score: f64) -> f64 {
    if max_score <= 0.0 {
        return 0.0;
    }
    score / max_score * 100.0
}

fn default_max_score() -> f64 {
    DEFAULT_MAX_SCORE
}

fn score_error() -> ValidationError {
    let mut err = ValidationError::new("score_exceeds_max");
    err.message = Some("Score cannot exceed the maximum score".into());
    err
}

fn validate_create_score(dto: &CreateGradeDto) -> Result<(), ValidationError> {
    if dto.score > dto.max_score {
        return Err(score_error());
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_score"))]
pub struct CreateGradeDto {
    pub student_id: StudentId,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    pub assessment_type: AssessmentType,
    #[validate(range(min = 0.0, message = "Score cannot be negative"))]
    pub score: f64,
    #[serde(default = "default_max_score")]
    #[validate(range(exclusive_min = 0.0, message = "Max score must be greater than 0"))]
    pub max_score: f64,
    pub notes: Option<String>,
    /// Defaults to now
    pub graded_at: Option<DateTime<Utc>>,
    pub teacher_id: Option<UserId>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateGradeDto {
    #[validate(length(min = 1, max = 200))]
    pub subject: Option<String>,
    pub assessment_type: Option<AssessmentType>,
    #[validate(range(min = 0.0, message = "Score cannot be negative"))]
    pub score: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Max score must be greater than 0"))]
    pub max_score: Option<f64>,
    pub notes: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl UpdateGradeDto {
    /// Checks the score against the maximum once merged with the stored grade.
    pub fn merged_scores(&self, current: &Grade) -> Result<(f64, f64), ValidationError> {
        let score = self.score.unwrap_or(current.score);
        let max_score = self.max_score.unwrap_or(current.max_score);
        if score > max_score {
            return Err(score_error());
        }
        Ok((score, max_score))
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct GradeFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    pub assessment_type: Option<AssessmentType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AssessmentTypeStats {
    pub count: usize,
    pub average_score: f64,
    pub average_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GradeStats {
    pub count: usize,
    pub average_score: f64,
    pub average_percentage: f64,
    /// Average percentage expressed on a 0–20 scale
    pub average_on_20: f64,
    pub by_assessment_type: BTreeMap<String, AssessmentTypeStats>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl GradeStats {
    pub fn from_grades(grades: &[Grade]) -> Self {
        let (average_score, average_percentage) = averages(grades.iter());

        let mut groups: BTreeMap<AssessmentType, Vec<&Grade>> = BTreeMap::new();
        for grade in grades {
            groups.entry(grade.assessment_type).or_default().push(grade);
        }

        let by_assessment_type = groups
            .into_iter()
            .map(|(kind, items)| {
                let (avg_score, avg_pct) = averages(items.iter().copied());
                (
                    kind.as_str().to_string(),
                    AssessmentTypeStats {
                        count: items.len(),
                        average_score: round2(avg_score),
                        average_percentage: round2(avg_pct),
                    },
                )
            })
            .collect();

        Self {
            count: grades.len(),
            average_score: round2(average_score),
            average_percentage: round2(average_percentage),
            average_on_20: round2(average_percentage / 5.0),
            by_assessment_type,
        }
    }
}

fn averages<'a>(grades: impl Iterator<Item = &'a Grade>) -> (f64, f64) {
    let (count, score_sum, pct_sum) = grades.fold((0usize, 0.0, 0.0), |(n, s, p), g| {
        (n + 1, s + g.score, p + g.percentage())
    });
    if count == 0 {
        return (0.0, 0.0);
    }
    (score_sum / count as f64, pct_sum / count as f64)
}
