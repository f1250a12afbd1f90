use sqlx::PgPool;
use tracing::{info, instrument};
use trainhub_core::AppError;
use trainhub_models::{GradeId, OrganizationId, SessionId, UserId};

use crate::modules::enrollments::service::EnrollmentService;
use crate::modules::sessions::service::SessionService;
use crate::utils::auth_helpers::ensure_in_scope;

use super::model::{CreateGradeDto, Grade, GradeFilterParams, GradeStats, UpdateGradeDto};

pub struct GradeService;

impl GradeService {
    async fn load_grade(
        db: &PgPool,
        id: GradeId,
        scope: Option<OrganizationId>,
    ) -> Result<Grade, AppError> {
        let grade = sqlx::query_as::<_, Grade>("SELECT * FROM grades WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Grade not found")))?;

        ensure_in_scope(scope, grade.organization_id, "Grade")?;

        Ok(grade)
    }

    #[instrument(skip(db, dto), fields(session.id = %session_id, student.id = %dto.student_id))]
    pub async fn create_grade(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        grader: Option<UserId>,
        dto: CreateGradeDto,
    ) -> Result<Grade, AppError> {
        let session = SessionService::load_session(db, session_id, scope).await?;

        if !EnrollmentService::is_enrolled(db, session_id, dto.student_id).await? {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student is not enrolled in this session"
            )));
        }

        let teacher_id = dto.teacher_id.or(grader);
        if let Some(teacher_id) = dto.teacher_id {
            let in_org = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND organization_id = $2)",
            )
            .bind(teacher_id.into_inner())
            .bind(session.organization_id.into_inner())
            .fetch_one(db)
            .await?;

            if !in_org {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Teacher must belong to the session's organization"
                )));
            }
        }

        let grade = sqlx::query_as::<_, Grade>(
            r#"
            INSERT INTO grades
                (organization_id, session_id, student_id, subject, assessment_type,
                 score, max_score, notes, graded_at, teacher_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW()), $10)
            RETURNING *
            "#,
        )
        .bind(session.organization_id.into_inner())
        .bind(session_id.into_inner())
        .bind(dto.student_id.into_inner())
        .bind(dto.subject.trim())
        .bind(dto.assessment_type)
        .bind(dto.score)
        .bind(dto.max_score)
        .bind(dto.notes)
        .bind(dto.graded_at)
        .bind(teacher_id.map(|id| id.into_inner()))
        .fetch_one(db)
        .await?;

        info!(grade.id = %grade.id, "Grade recorded");
        Ok(grade)
    }

    #[instrument(skip(db))]
    pub async fn get_session_grades(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        filters: &GradeFilterParams,
    ) -> Result<Vec<Grade>, AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        let grades = sqlx::query_as::<_, Grade>(
            r#"
            SELECT * FROM grades
            WHERE session_id = $1
              AND ($2::uuid IS NULL OR student_id = $2)
              AND ($3::assessment_type IS NULL OR assessment_type = $3)
            ORDER BY graded_at DESC
            "#,
        )
        .bind(session_id.into_inner())
        .bind(filters.student_id)
        .bind(filters.assessment_type)
        .fetch_all(db)
        .await?;

        Ok(grades)
    }

    #[instrument(skip(db))]
    pub async fn get_stats(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        filters: &GradeFilterParams,
    ) -> Result<GradeStats, AppError> {
        let grades = Self::get_session_grades(db, session_id, scope, filters).await?;
        Ok(GradeStats::from_grades(&grades))
    }

    #[instrument(skip(db, dto), fields(grade.id = %id))]
    pub async fn update_grade(
        db: &PgPool,
        id: GradeId,
        scope: Option<OrganizationId>,
        dto: UpdateGradeDto,
    ) -> Result<Grade, AppError> {
        let current = Self::load_grade(db, id, scope).await?;
        let (score, max_score) = dto
            .merged_scores(&current)
            .map_err(|e| AppError::unprocessable(anyhow::anyhow!(e.to_string())))?;

        let grade = sqlx::query_as::<_, Grade>(
            r#"
            UPDATE grades SET
                subject = COALESCE($2, subject),
                assessment_type = COALESCE($3, assessment_type),
                score = $4,
                max_score = $5,
                notes = COALESCE($6, notes),
                graded_at = COALESCE($7, graded_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(dto.subject.as_deref().map(str::trim))
        .bind(dto.assessment_type)
        .bind(score)
        .bind(max_score)
        .bind(dto.notes)
        .bind(dto.graded_at)
        .fetch_one(db)
        .await?;

        Ok(grade)
    }

    #[instrument(skip(db), fields(grade.id = %id))]
    pub async fn delete_grade(
        db: &PgPool,
        id: GradeId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        Self::load_grade(db, id, scope).await?;

        sqlx::query("DELETE FROM grades WHERE id = $1")
            .bind(id.into_inner())
            .execute(db)
            .await?;

        Ok(())
    }
}
