//! E-learning: courses, lessons, per-learner progress and quiz attempts.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trainhub_core::serde::deserialize_optional_uuid;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{
    CourseId, LessonId, LessonProgressId, OrganizationId, QuizAttemptId, SessionId, StudentId,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: CourseId,
    pub organization_id: OrganizationId,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lesson {
    pub id: LessonId,
    pub course_id: CourseId,
    pub title: String,
    pub position: i32,
    pub duration_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseWithLessons {
    #[serde(flatten)]
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SessionCourse {
    pub session_id: SessionId,
    pub course_id: CourseId,
    pub title: String,
    pub is_required: bool,
    pub due_date: Option<NaiveDate>,
    pub lesson_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LessonProgress {
    pub id: LessonProgressId,
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub completion_percentage: i32,
    pub is_completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct QuizAttempt {
    pub id: QuizAttemptId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub score: f64,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Derived from the title when omitted
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CourseFilterParams {
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLessonDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Appended after the last lesson when omitted
    #[validate(range(min = 0))]
    pub position: Option<i32>,
    #[validate(range(min = 0))]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LinkCourseDto {
    pub course_id: CourseId,
    pub is_required: Option<bool>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TrackProgressDto {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    #[validate(range(min = 0, max = 100))]
    pub completion_percentage: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompleteLessonDto {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuizAttemptDto {
    pub student_id: StudentId,
    pub course_id: CourseId,
    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100"))]
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn from_counts(completed: i64, total: i64) -> Self {
        if completed > 0 && completed >= total {
            Self::Completed
        } else if completed > 0 {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }
}

/// Raw per (learner, course) counters, as aggregated by the database.
#[derive(Debug, Clone, FromRow)]
pub struct CourseProgressRow {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub course_id: CourseId,
    pub course_title: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub average_quiz_score: Option<f64>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentCourseProgress {
    pub student_id: StudentId,
    pub student_name: String,
    pub course_id: CourseId,
    pub course_title: String,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress: i64,
    pub quiz_score: Option<i64>,
    pub last_activity: Option<DateTime<Utc>>,
    pub status: ProgressStatus,
}

impl From<CourseProgressRow> for StudentCourseProgress {
    fn from(row: CourseProgressRow) -> Self {
        let progress = if row.total_lessons > 0 {
            ((row.completed_lessons as f64 / row.total_lessons as f64) * 100.0).round() as i64
        } else {
            0
        };

        Self {
            student_id: row.student_id,
            student_name: format!("{} {}", row.first_name, row.last_name),
            course_id: row.course_id,
            course_title: row.course_title,
            completed_lessons: row.completed_lessons,
            total_lessons: row.total_lessons,
            progress,
            quiz_score: row.average_quiz_score.map(|s| s.round() as i64),
            last_activity: row.last_activity,
            status: ProgressStatus::from_counts(row.completed_lessons, row.total_lessons),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ProgressStats {
    pub avg_progress: i64,
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub avg_score: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CourseProgressStats {
    pub course_id: CourseId,
    pub course_title: String,
    pub avg_progress: i64,
    pub completed: usize,
    pub total: usize,
    pub avg_score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionProgressReport {
    pub rows: Vec<StudentCourseProgress>,
    pub stats: ProgressStats,
    pub courses: Vec<CourseProgressStats>,
}

fn mean_rounded(values: impl Iterator<Item = i64>) -> Option<i64> {
    let (count, sum) = values.fold((0i64, 0i64), |(n, s), v| (n + 1, s + v));
    (count > 0).then(|| (sum as f64 / count as f64).round() as i64)
}

impl SessionProgressReport {
    pub fn from_rows(rows: Vec<CourseProgressRow>) -> Self {
        let rows: Vec<StudentCourseProgress> = rows.into_iter().map(Into::into).collect();

        let count_status =
            |status: ProgressStatus| rows.iter().filter(|r| r.status == status).count();

        let stats = ProgressStats {
            avg_progress: mean_rounded(rows.iter().map(|r| r.progress)).unwrap_or(0),
            completed: count_status(ProgressStatus::Completed),
            in_progress: count_status(ProgressStatus::InProgress),
            not_started: count_status(ProgressStatus::NotStarted),
            avg_score: mean_rounded(rows.iter().filter_map(|r| r.quiz_score)),
        };

        let mut order: Vec<CourseId> = Vec::new();
        let mut by_course: HashMap<CourseId, Vec<&StudentCourseProgress>> = HashMap::new();
        for row in &rows {
            if !by_course.contains_key(&row.course_id) {
                order.push(row.course_id);
            }
            by_course.entry(row.course_id).or_default().push(row);
        }

        let courses = order
            .into_iter()
            .filter_map(|course_id| {
                let items = by_course.get(&course_id)?;
                Some(CourseProgressStats {
                    course_id,
                    course_title: items.first()?.course_title.clone(),
                    avg_progress: mean_rounded(items.iter().map(|r| r.progress)).unwrap_or(0),
                    completed: items
                        .iter()
                        .filter(|r| r.status == ProgressStatus::Completed)
                        .count(),
                    total: items.len(),
                    avg_score: mean_rounded(items.iter().filter_map(|r| r.quiz_score)),
                })
            })
            .collect();

        Self {
            rows,
            stats,
            courses,
        }
    }
}

/// Lower-case, ASCII-only slug with single dashes.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.chars() {
        let mapped = match c {
            'à' | 'â' | 'ä' | 'á' | 'À' | 'Â' => 'a',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' => 'e',
            'î' | 'ï' | 'í' | 'Î' => 'i',
            'ô' | 'ö' | 'ó' | 'Ô' => 'o',
            'ù' | 'û' | 'ü' | 'ú' | 'Û' => 'u',
            'ç' | 'Ç' => 'c',
            c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
            _ => '-',
        };
        if mapped == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(mapped);
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(student: StudentId, course: CourseId, completed: i64, total: i64, quiz: Option<f64>) -> CourseProgressRow {
        CourseProgressRow {
            student_id: student,
            first_name: "Awa".to_string(),
            last_name: "Traoré".to_string(),
            course_id: course,
            course_title: "Sécurité".to_string(),
            total_lessons: total,
            completed_lessons: completed,
            average_quiz_score: quiz,
            last_activity: None,
        }
    }

    #[test]
    fn test_progress_status_from_counts() {
        assert_eq!(ProgressStatus::from_counts(0, 5), ProgressStatus::NotStarted);
        assert_eq!(ProgressStatus::from_counts(2, 5), ProgressStatus::InProgress);
        assert_eq!(ProgressStatus::from_counts(5, 5), ProgressStatus::Completed);
        // A course without lessons is never completed.
        assert_eq!(ProgressStatus::from_counts(0, 0), ProgressStatus::NotStarted);
    }

    #[test]
    fn test_progress_percentage_rounds() {
        let progress: StudentCourseProgress =
            row(StudentId::new(), CourseId::new(), 1, 3, Some(72.5)).into();
        assert_eq!(progress.progress, 33);
        assert_eq!(progress.quiz_score, Some(73));

        let empty: StudentCourseProgress = row(StudentId::new(), CourseId::new(), 0, 0, None).into();
        assert_eq!(empty.progress, 0);
        assert_eq!(empty.quiz_score, None);
    }

    #[test]
    fn test_report_aggregates_globally_and_per_course() {
        let course_a = CourseId::new();
        let course_b = CourseId::new();
        let s1 = StudentId::new();
        let s2 = StudentId::new();

        let report = SessionProgressReport::from_rows(vec![
            row(s1, course_a, 4, 4, Some(80.0)),
            row(s2, course_a, 2, 4, None),
            row(s1, course_b, 0, 2, Some(60.0)),
        ]);

        assert_eq!(report.stats.completed, 1);
        assert_eq!(report.stats.in_progress, 1);
        assert_eq!(report.stats.not_started, 1);
        // (100 + 50 + 0) / 3
        assert_eq!(report.stats.avg_progress, 50);
        assert_eq!(report.stats.avg_score, Some(70));

        assert_eq!(report.courses.len(), 2);
        assert_eq!(report.courses[0].course_id, course_a);
        assert_eq!(report.courses[0].avg_progress, 75);
        assert_eq!(report.courses[0].completed, 1);
        assert_eq!(report.courses[0].total, 2);
        assert_eq!(report.courses[0].avg_score, Some(80));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Sécurité au travail : niveau 1"), "securite-au-travail-niveau-1");
        assert_eq!(slugify("  Excel -- avancé "), "excel-avance");
    }
}
