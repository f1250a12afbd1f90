use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use trainhub_cache::{RedisCache, hash_filters, invalidate, keys};
use trainhub_core::{AppError, PaginationMeta};
use trainhub_models::organizations::DEFAULT_CURRENCY;
use trainhub_models::{FormationId, OrganizationId};

use crate::utils::auth_helpers::ensure_in_scope;

use super::model::{
    CreateFormationDto, Formation, FormationFilterParams, PaginatedFormationsResponse,
    UpdateFormationDto,
};

fn map_code_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!(
            "A formation with this code already exists"
        ));
    }
    AppError::from(e)
}

pub struct FormationService;

impl FormationService {
    #[instrument(skip(db, cache, dto), fields(formation.name = %dto.name, db.operation = "INSERT", db.table = "formations"))]
    pub async fn create_formation(
        db: &PgPool,
        cache: Option<&RedisCache>,
        organization_id: OrganizationId,
        dto: CreateFormationDto,
    ) -> Result<Formation, AppError> {
        let formation = sqlx::query_as::<_, Formation>(
            r#"
            INSERT INTO formations
                (organization_id, name, code, description, duration_hours, price, currency,
                 objectives, prerequisites, target_audience, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(dto.name.trim())
        .bind(dto.code.map(|c| c.trim().to_string()))
        .bind(dto.description)
        .bind(dto.duration_hours)
        .bind(dto.price.unwrap_or(0.0))
        .bind(
            dto.currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        )
        .bind(dto.objectives)
        .bind(dto.prerequisites)
        .bind(dto.target_audience)
        .bind(dto.is_active.unwrap_or(true))
        .fetch_one(db)
        .await
        .map_err(map_code_conflict)?;

        invalidate::formation(cache, organization_id.into_inner(), None).await;
        info!(formation.id = %formation.id, "Formation created");

        Ok(formation)
    }

    #[instrument(skip(db, cache), fields(db.operation = "SELECT", db.table = "formations"))]
    pub async fn get_formations(
        db: &PgPool,
        cache: Option<&RedisCache>,
        organization_id: OrganizationId,
        filters: FormationFilterParams,
    ) -> Result<PaginatedFormationsResponse, AppError> {
        let cache_key = keys::formations::list(organization_id.into_inner(), &hash_filters(&filters));

        if let Some(cache) = cache
            && let Some(page) = cache.get::<PaginatedFormationsResponse>(&cache_key).await
        {
            debug!("Formation list found in cache");
            return Ok(page);
        }

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let formations = sqlx::query_as::<_, Formation>(
            r#"
            SELECT * FROM formations
            WHERE organization_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR code ILIKE $2)
              AND ($3::boolean IS NULL OR is_active = $3)
            ORDER BY name
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(&search)
        .bind(filters.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM formations
            WHERE organization_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR code ILIKE $2)
              AND ($3::boolean IS NULL OR is_active = $3)
            "#,
        )
        .bind(organization_id.into_inner())
        .bind(&search)
        .bind(filters.is_active)
        .fetch_one(db)
        .await?;

        let page = PaginatedFormationsResponse {
            data: formations,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        };

        if let Some(cache) = cache
            && let Err(e) = cache.set(&cache_key, &page).await
        {
            warn!(error = %e, "Failed to cache formation list");
        }

        Ok(page)
    }

    #[instrument(skip(db, cache), fields(formation.id = %id, db.operation = "SELECT", db.table = "formations"))]
    pub async fn get_formation(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: FormationId,
        scope: Option<OrganizationId>,
    ) -> Result<Formation, AppError> {
        let cache_key = keys::formations::by_id(id.into_inner());

        if let Some(cache) = cache
            && let Some(formation) = cache.get::<Formation>(&cache_key).await
        {
            debug!("Formation found in cache");
            ensure_in_scope(scope, formation.organization_id, "Formation")?;
            return Ok(formation);
        }

        let formation = sqlx::query_as::<_, Formation>("SELECT * FROM formations WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Formation not found")))?;

        ensure_in_scope(scope, formation.organization_id, "Formation")?;

        if let Some(cache) = cache
            && let Err(e) = cache.set(&cache_key, &formation).await
        {
            warn!(error = %e, "Failed to cache formation");
        }

        Ok(formation)
    }

    #[instrument(skip(db, cache, dto), fields(formation.id = %id, db.operation = "UPDATE", db.table = "formations"))]
    pub async fn update_formation(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: FormationId,
        scope: Option<OrganizationId>,
        dto: UpdateFormationDto,
    ) -> Result<Formation, AppError> {
        let formation = sqlx::query_as::<_, Formation>(
            r#"
            UPDATE formations SET
                name = COALESCE($3, name),
                code = COALESCE($4, code),
                description = COALESCE($5, description),
                duration_hours = COALESCE($6, duration_hours),
                price = COALESCE($7, price),
                currency = COALESCE($8, currency),
                objectives = COALESCE($9, objectives),
                prerequisites = COALESCE($10, prerequisites),
                target_audience = COALESCE($11, target_audience),
                is_active = COALESCE($12, is_active),
                updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR organization_id = $2)
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(scope.map(|id| id.into_inner()))
        .bind(dto.name.map(|n| n.trim().to_string()))
        .bind(dto.code.map(|c| c.trim().to_string()))
        .bind(dto.description)
        .bind(dto.duration_hours)
        .bind(dto.price)
        .bind(dto.currency.map(|c| c.to_uppercase()))
        .bind(dto.objectives)
        .bind(dto.prerequisites)
        .bind(dto.target_audience)
        .bind(dto.is_active)
        .fetch_optional(db)
        .await
        .map_err(map_code_conflict)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Formation not found")))?;

        invalidate::formation(
            cache,
            formation.organization_id.into_inner(),
            Some(id.into_inner()),
        )
        .await;

        Ok(formation)
    }

    #[instrument(skip(db, cache), fields(formation.id = %id, db.operation = "DELETE", db.table = "formations"))]
    pub async fn delete_formation(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: FormationId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        let formation = Self::get_formation(db, None, id, scope).await?;

        let has_sessions = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE formation_id = $1)",
        )
        .bind(id.into_inner())
        .fetch_one(db)
        .await?;

        if has_sessions {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot delete a formation used by sessions"
            )));
        }

        sqlx::query("DELETE FROM formations WHERE id = $1")
            .bind(id.into_inner())
            .execute(db)
            .await?;

        invalidate::formation(
            cache,
            formation.organization_id.into_inner(),
            Some(id.into_inner()),
        )
        .await;
        info!("Formation deleted");

        Ok(())
    }
}
