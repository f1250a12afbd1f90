use sqlx::PgPool;
use tracing::{info, instrument};
use trainhub_core::AppError;
use trainhub_models::{CourseId, LessonId, OrganizationId, SessionId, StudentId};

use crate::modules::sessions::service::SessionService;
use crate::utils::auth_helpers::ensure_in_scope;

use super::model::{
    CompleteLessonDto, Course, CourseFilterParams, CourseProgressRow, CourseWithLessons,
    CreateCourseDto, CreateLessonDto, CreateQuizAttemptDto, Lesson, LessonProgress,
    LinkCourseDto, QuizAttempt, SessionCourse, SessionProgressReport, TrackProgressDto,
    UpdateCourseDto, slugify,
};

fn map_course_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!(
            "A course with this slug already exists"
        ));
    }
    AppError::from(e)
}

pub struct ElearningService;

impl ElearningService {
    async fn load_course(
        db: &PgPool,
        id: CourseId,
        scope: Option<OrganizationId>,
    ) -> Result<Course, AppError> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))?;

        ensure_in_scope(scope, course.organization_id, "Course")?;

        Ok(course)
    }

    /// Organization owning the lesson, through its course.
    async fn lesson_owner(
        db: &PgPool,
        lesson_id: LessonId,
        scope: Option<OrganizationId>,
    ) -> Result<OrganizationId, AppError> {
        let owner = sqlx::query_scalar::<_, OrganizationId>(
            r#"
            SELECT c.organization_id FROM lessons l
            INNER JOIN courses c ON c.id = l.course_id
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id.into_inner())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Lesson not found")))?;

        ensure_in_scope(scope, owner, "Lesson")?;

        Ok(owner)
    }

    async fn ensure_student(
        db: &PgPool,
        student_id: StudentId,
        organization_id: OrganizationId,
    ) -> Result<(), AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = $1 AND organization_id = $2)",
        )
        .bind(student_id.into_inner())
        .bind(organization_id.into_inner())
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(AppError::not_found(anyhow::anyhow!("Student not found")));
        }
        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn create_course(
        db: &PgPool,
        organization_id: OrganizationId,
        dto: CreateCourseDto,
    ) -> Result<Course, AppError> {
        let slug = match dto.slug.as_deref() {
            Some(slug) => slugify(slug),
            None => slugify(&dto.title),
        };
        if slug.is_empty() {
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "Course slug cannot be empty"
            )));
        }

        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (organization_id, title, slug, description, is_published)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(dto.title.trim())
        .bind(&slug)
        .bind(dto.description)
        .bind(dto.is_published)
        .fetch_one(db)
        .await
        .map_err(map_course_conflict)?;

        info!(course.id = %course.id, course.slug = %course.slug, "Course created");
        Ok(course)
    }

    #[instrument(skip(db))]
    pub async fn get_courses(
        db: &PgPool,
        organization_id: OrganizationId,
        filters: CourseFilterParams,
    ) -> Result<Vec<Course>, AppError> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT * FROM courses
            WHERE organization_id = $1
              AND ($2::boolean IS NULL OR is_published = $2)
            ORDER BY title
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(filters.is_published)
        .fetch_all(db)
        .await?;

        Ok(courses)
    }

    #[instrument(skip(db))]
    pub async fn get_course(
        db: &PgPool,
        id: CourseId,
        scope: Option<OrganizationId>,
    ) -> Result<CourseWithLessons, AppError> {
        let course = Self::load_course(db, id, scope).await?;

        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE course_id = $1 ORDER BY position, created_at",
        )
        .bind(id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(CourseWithLessons { course, lessons })
    }

    #[instrument(skip(db, dto))]
    pub async fn update_course(
        db: &PgPool,
        id: CourseId,
        scope: Option<OrganizationId>,
        dto: UpdateCourseDto,
    ) -> Result<Course, AppError> {
        Self::load_course(db, id, scope).await?;

        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                is_published = COALESCE($4, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(dto.title.as_deref().map(str::trim))
        .bind(dto.description)
        .bind(dto.is_published)
        .fetch_one(db)
        .await?;

        Ok(course)
    }

    #[instrument(skip(db))]
    pub async fn delete_course(
        db: &PgPool,
        id: CourseId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        Self::load_course(db, id, scope).await?;

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id.into_inner())
            .execute(db)
            .await?;

        info!(course.id = %id, "Course deleted");
        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn create_lesson(
        db: &PgPool,
        course_id: CourseId,
        scope: Option<OrganizationId>,
        dto: CreateLessonDto,
    ) -> Result<Lesson, AppError> {
        Self::load_course(db, course_id, scope).await?;

        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            INSERT INTO lessons (course_id, title, position, duration_minutes)
            VALUES (
                $1, $2,
                COALESCE($3, (SELECT COALESCE(MAX(position) + 1, 0) FROM lessons WHERE course_id = $1)),
                $4
            )
            RETURNING *
            "#,
        )
        .bind(course_id.into_inner())
        .bind(dto.title.trim())
        .bind(dto.position)
        .bind(dto.duration_minutes)
        .fetch_one(db)
        .await?;

        Ok(lesson)
    }

    #[instrument(skip(db))]
    pub async fn delete_lesson(
        db: &PgPool,
        course_id: CourseId,
        lesson_id: LessonId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        Self::load_course(db, course_id, scope).await?;

        let result = sqlx::query("DELETE FROM lessons WHERE id = $1 AND course_id = $2")
            .bind(lesson_id.into_inner())
            .bind(course_id.into_inner())
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Lesson not found")));
        }
        Ok(())
    }

    #[instrument(skip(db, dto), fields(session.id = %session_id, course.id = %dto.course_id))]
    pub async fn link_course(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
        dto: LinkCourseDto,
    ) -> Result<Vec<SessionCourse>, AppError> {
        let session = SessionService::load_session(db, session_id, scope).await?;
        Self::load_course(db, dto.course_id, Some(session.organization_id)).await?;

        sqlx::query(
            r#"
            INSERT INTO session_courses (session_id, course_id, is_required, due_date)
            VALUES ($1, $2, COALESCE($3, TRUE), $4)
            ON CONFLICT (session_id, course_id) DO UPDATE SET
                is_required = EXCLUDED.is_required,
                due_date = EXCLUDED.due_date
            "#,
        )
        .bind(session_id.into_inner())
        .bind(dto.course_id.into_inner())
        .bind(dto.is_required)
        .bind(dto.due_date)
        .execute(db)
        .await?;

        info!("Course linked to session");
        Self::session_courses(db, session_id).await
    }

    #[instrument(skip(db))]
    pub async fn unlink_course(
        db: &PgPool,
        session_id: SessionId,
        course_id: CourseId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        let result =
            sqlx::query("DELETE FROM session_courses WHERE session_id = $1 AND course_id = $2")
                .bind(session_id.into_inner())
                .bind(course_id.into_inner())
                .execute(db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Course is not linked to this session"
            )));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_session_courses(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<Vec<SessionCourse>, AppError> {
        SessionService::load_session(db, session_id, scope).await?;
        Self::session_courses(db, session_id).await
    }

    async fn session_courses(
        db: &PgPool,
        session_id: SessionId,
    ) -> Result<Vec<SessionCourse>, AppError> {
        let courses = sqlx::query_as::<_, SessionCourse>(
            r#"
            SELECT
                sc.session_id, sc.course_id, c.title, sc.is_required, sc.due_date,
                (SELECT COUNT(*) FROM lessons l WHERE l.course_id = c.id) AS lesson_count
            FROM session_courses sc
            INNER JOIN courses c ON c.id = sc.course_id
            WHERE sc.session_id = $1
            ORDER BY sc.due_date NULLS LAST, c.title
            "#,
        )
        .bind(session_id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(courses)
    }

    #[instrument(skip(db, dto), fields(student.id = %dto.student_id, lesson.id = %dto.lesson_id))]
    pub async fn track_progress(
        db: &PgPool,
        scope: Option<OrganizationId>,
        dto: TrackProgressDto,
    ) -> Result<LessonProgress, AppError> {
        let owner = Self::lesson_owner(db, dto.lesson_id, scope).await?;
        Self::ensure_student(db, dto.student_id, owner).await?;

        let progress = sqlx::query_as::<_, LessonProgress>(
            r#"
            INSERT INTO lesson_progress (student_id, lesson_id, completion_percentage)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, lesson_id) DO UPDATE SET
                completion_percentage = EXCLUDED.completion_percentage,
                last_accessed_at = NOW()
            RETURNING *
            "#,
        )
        .bind(dto.student_id.into_inner())
        .bind(dto.lesson_id.into_inner())
        .bind(dto.completion_percentage)
        .fetch_one(db)
        .await?;

        Ok(progress)
    }

    #[instrument(skip(db, dto), fields(student.id = %dto.student_id, lesson.id = %dto.lesson_id))]
    pub async fn complete_lesson(
        db: &PgPool,
        scope: Option<OrganizationId>,
        dto: CompleteLessonDto,
    ) -> Result<LessonProgress, AppError> {
        let owner = Self::lesson_owner(db, dto.lesson_id, scope).await?;
        Self::ensure_student(db, dto.student_id, owner).await?;

        let progress = sqlx::query_as::<_, LessonProgress>(
            r#"
            INSERT INTO lesson_progress
                (student_id, lesson_id, completion_percentage, is_completed, completed_at)
            VALUES ($1, $2, 100, TRUE, NOW())
            ON CONFLICT (student_id, lesson_id) DO UPDATE SET
                completion_percentage = 100,
                is_completed = TRUE,
                completed_at = NOW(),
                last_accessed_at = NOW()
            RETURNING *
            "#,
        )
        .bind(dto.student_id.into_inner())
        .bind(dto.lesson_id.into_inner())
        .fetch_one(db)
        .await?;

        info!("Lesson completed");
        Ok(progress)
    }

    #[instrument(skip(db, dto), fields(student.id = %dto.student_id, course.id = %dto.course_id))]
    pub async fn record_quiz_attempt(
        db: &PgPool,
        scope: Option<OrganizationId>,
        dto: CreateQuizAttemptDto,
    ) -> Result<QuizAttempt, AppError> {
        let course = Self::load_course(db, dto.course_id, scope).await?;
        Self::ensure_student(db, dto.student_id, course.organization_id).await?;

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            INSERT INTO quiz_attempts (student_id, course_id, score)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(dto.student_id.into_inner())
        .bind(dto.course_id.into_inner())
        .bind(dto.score)
        .fetch_one(db)
        .await?;

        Ok(attempt)
    }

    /// Progress of every non-cancelled learner on every course linked to the
    /// session.
    #[instrument(skip(db))]
    pub async fn get_session_progress(
        db: &PgPool,
        session_id: SessionId,
        scope: Option<OrganizationId>,
    ) -> Result<SessionProgressReport, AppError> {
        SessionService::load_session(db, session_id, scope).await?;

        let rows = sqlx::query_as::<_, CourseProgressRow>(
            r#"
            SELECT
                st.id AS student_id, st.first_name, st.last_name,
                c.id AS course_id, c.title AS course_title,
                (SELECT COUNT(*) FROM lessons l WHERE l.course_id = c.id) AS total_lessons,
                (SELECT COUNT(*) FROM lesson_progress lp
                    INNER JOIN lessons l ON l.id = lp.lesson_id
                    WHERE l.course_id = c.id AND lp.student_id = st.id AND lp.is_completed
                ) AS completed_lessons,
                (SELECT AVG(qa.score) FROM quiz_attempts qa
                    WHERE qa.course_id = c.id AND qa.student_id = st.id
                ) AS average_quiz_score,
                GREATEST(
                    (SELECT MAX(lp.last_accessed_at) FROM lesson_progress lp
                        INNER JOIN lessons l ON l.id = lp.lesson_id
                        WHERE l.course_id = c.id AND lp.student_id = st.id),
                    (SELECT MAX(qa.attempted_at) FROM quiz_attempts qa
                        WHERE qa.course_id = c.id AND qa.student_id = st.id)
                ) AS last_activity
            FROM enrollments e
            INNER JOIN students st ON st.id = e.student_id
            INNER JOIN session_courses sc ON sc.session_id = e.session_id
            INNER JOIN courses c ON c.id = sc.course_id
            WHERE e.session_id = $1 AND e.status <> 'cancelled'
            ORDER BY c.title, st.last_name, st.first_name
            "#,
        )
        .bind(session_id.into_inner())
        .fetch_all(db)
        .await?;

        Ok(SessionProgressReport::from_rows(rows))
    }
}
