use sqlx::PgPool;
use tracing::{info, instrument};
use trainhub_core::{AppError, PaginationMeta};
use trainhub_models::{OrganizationId, StudentId};

use super::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};

fn map_student_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!(
            "A student with this email already exists"
        ));
    }
    AppError::from(e)
}

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db, dto))]
    pub async fn create_student(
        db: &PgPool,
        organization_id: OrganizationId,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students
                (organization_id, first_name, last_name, email, phone, address,
                 date_of_birth, student_number, company_name, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(dto.email.map(|e| e.into_inner()))
        .bind(dto.phone)
        .bind(dto.address)
        .bind(dto.date_of_birth)
        .bind(dto.student_number)
        .bind(dto.company_name)
        .bind(dto.status.unwrap_or_default())
        .fetch_one(db)
        .await
        .map_err(map_student_conflict)?;

        info!(student.id = %student.id, "Student created");

        Ok(student)
    }

    #[instrument(skip(db))]
    pub async fn get_students(
        db: &PgPool,
        organization_id: OrganizationId,
        filters: StudentFilterParams,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT * FROM students
            WHERE organization_id = $1
              AND ($2::text IS NULL
                   OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
              AND ($3::student_status IS NULL OR status = $3)
            ORDER BY last_name, first_name
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(&search)
        .bind(filters.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM students
            WHERE organization_id = $1
              AND ($2::text IS NULL
                   OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
              AND ($3::student_status IS NULL OR status = $3)
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(&search)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        Ok(PaginatedStudentsResponse {
            data: students,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_student(
        db: &PgPool,
        id: StudentId,
        scope: Option<OrganizationId>,
    ) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE id = $1 AND ($2::uuid IS NULL OR organization_id = $2)",
        )
        .bind(id.into_inner())
        .bind(scope.map(|id| id.into_inner()))
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_student(
        db: &PgPool,
        id: StudentId,
        scope: Option<OrganizationId>,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                date_of_birth = COALESCE($8, date_of_birth),
                student_number = COALESCE($9, student_number),
                company_name = COALESCE($10, company_name),
                status = COALESCE($11, status),
                updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR organization_id = $2)
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(scope.map(|id| id.into_inner()))
        .bind(dto.first_name.map(|n| n.trim().to_string()))
        .bind(dto.last_name.map(|n| n.trim().to_string()))
        .bind(dto.email.map(|e| e.into_inner()))
        .bind(dto.phone)
        .bind(dto.address)
        .bind(dto.date_of_birth)
        .bind(dto.student_number)
        .bind(dto.company_name)
        .bind(dto.status)
        .fetch_optional(db)
        .await
        .map_err(map_student_conflict)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_student(
        db: &PgPool,
        id: StudentId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        let student = Self::get_student(db, id, scope).await?;

        let has_enrollments = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE student_id = $1)",
        )
        .bind(student.id.into_inner())
        .fetch_one(db)
        .await?;

        if has_enrollments {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot delete a student with enrollments"
            )));
        }

        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(student.id.into_inner())
            .execute(db)
            .await?;

        info!(student.id = %id, "Student deleted");

        Ok(())
    }
}
