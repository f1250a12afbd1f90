use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{info, instrument};
use trainhub_core::{AppError, PaginationMeta};
use trainhub_models::{OrganizationId, ProgramId};

use super::model::{
    CreateProgramDto, PaginatedProgramsResponse, Program, ProgramFilterParams, UpdateProgramDto,
};

pub struct ProgramService;

impl ProgramService {
    #[instrument(skip(db, dto), fields(program.name = %dto.name))]
    pub async fn create_program(
        db: &PgPool,
        organization_id: OrganizationId,
        dto: CreateProgramDto,
    ) -> Result<Program, AppError> {
        let program = sqlx::query_as::<_, Program>(
            r#"
            INSERT INTO programs (organization_id, name, code, description, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(dto.name.trim())
        .bind(dto.code)
        .bind(dto.description)
        .bind(Json(dto.content))
        .fetch_one(db)
        .await?;

        info!(program.id = %program.id, modules = program.content.len(), "Program created");

        Ok(program)
    }

    #[instrument(skip(db))]
    pub async fn get_programs(
        db: &PgPool,
        organization_id: OrganizationId,
        filters: ProgramFilterParams,
    ) -> Result<PaginatedProgramsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let programs = sqlx::query_as::<_, Program>(
            r#"
            SELECT * FROM programs
            WHERE organization_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR code ILIKE $2)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM programs
            WHERE organization_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR code ILIKE $2)
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(&search)
        .fetch_one(db)
        .await?;

        Ok(PaginatedProgramsResponse {
            data: programs,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_program(
        db: &PgPool,
        id: ProgramId,
        scope: Option<OrganizationId>,
    ) -> Result<Program, AppError> {
        sqlx::query_as::<_, Program>(
            "SELECT * FROM programs WHERE id = $1 AND ($2::uuid IS NULL OR organization_id = $2)",
        )
        .bind(id.into_inner())
        .bind(scope.map(|id| id.into_inner()))
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Program not found")))
    }

    /// Programs linked to a session, in name order.
    pub async fn get_session_programs(
        db: &PgPool,
        session_id: uuid::Uuid,
    ) -> Result<Vec<Program>, AppError> {
        let programs = sqlx::query_as::<_, Program>(
            r#"
            SELECT p.* FROM programs p
            INNER JOIN session_programs sp ON sp.program_id = p.id
            WHERE sp.session_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(session_id)
        .fetch_all(db)
        .await?;
        Ok(programs)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_program(
        db: &PgPool,
        id: ProgramId,
        scope: Option<OrganizationId>,
        dto: UpdateProgramDto,
    ) -> Result<Program, AppError> {
        sqlx::query_as::<_, Program>(
            r#"
            UPDATE programs SET
                name = COALESCE($3, name),
                code = COALESCE($4, code),
                description = COALESCE($5, description),
                content = COALESCE($6, content),
                updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR organization_id = $2)
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(scope.map(|id| id.into_inner()))
        .bind(dto.name.map(|n| n.trim().to_string()))
        .bind(dto.code)
        .bind(dto.description)
        .bind(dto.content.map(Json))
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Program not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_program(
        db: &PgPool,
        id: ProgramId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM programs WHERE id = $1 AND ($2::uuid IS NULL OR organization_id = $2)",
        )
        .bind(id.into_inner())
        .bind(scope.map(|id| id.into_inner()))
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Program not found")));
        }

        info!(program.id = %id, "Program deleted");

        Ok(())
    }
}
