use sqlx::PgPool;
use tracing::{info, instrument};
use trainhub_core::{AppError, PaginationMeta};
use trainhub_models::OrganizationId;

use super::model::{
    CreateOrganizationDto, DEFAULT_CURRENCY, Organization, OrganizationFilterParams,
    PaginatedOrganizationsResponse, UpdateOrganizationDto,
};

pub struct OrganizationService;

impl OrganizationService {
    #[instrument(skip(db, dto), fields(name = %dto.name))]
    pub async fn create_organization(
        db: &PgPool,
        dto: CreateOrganizationDto,
    ) -> Result<Organization, AppError> {
        let currency = dto
            .currency
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations
                (name, address, city, phone, email, siret, vat_number, director_name, currency, logo_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(dto.name.trim())
        .bind(dto.address)
        .bind(dto.city)
        .bind(dto.phone)
        .bind(dto.email)
        .bind(dto.siret)
        .bind(dto.vat_number)
        .bind(dto.director_name)
        .bind(currency)
        .bind(dto.logo_url)
        .fetch_one(db)
        .await?;

        info!(organization.id = %organization.id, "Organization created");

        Ok(organization)
    }

    /// Lists organizations. A `scope` restricts the result to that single
    /// organization.
    #[instrument(skip(db))]
    pub async fn get_organizations(
        db: &PgPool,
        scope: Option<OrganizationId>,
        filters: OrganizationFilterParams,
    ) -> Result<PaginatedOrganizationsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let search = filters.search.map(|s| format!("%{}%", s));
        let scope = scope.map(|id| id.into_inner());

        let organizations = sqlx::query_as::<_, Organization>(
            r#"
            SELECT * FROM organizations
            WHERE ($1::uuid IS NULL OR id = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(scope)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM organizations
            WHERE ($1::uuid IS NULL OR id = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
            "#,
        )
        .bind(scope)
        .bind(&search)
        .fetch_one(db)
        .await?;

        Ok(PaginatedOrganizationsResponse {
            data: organizations,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_organization(
        db: &PgPool,
        id: OrganizationId,
    ) -> Result<Organization, AppError> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Organization not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_organization(
        db: &PgPool,
        id: OrganizationId,
        dto: UpdateOrganizationDto,
    ) -> Result<Organization, AppError> {
        sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                city = COALESCE($4, city),
                phone = COALESCE($5, phone),
                email = COALESCE($6, email),
                siret = COALESCE($7, siret),
                vat_number = COALESCE($8, vat_number),
                director_name = COALESCE($9, director_name),
                currency = COALESCE($10, currency),
                logo_url = COALESCE($11, logo_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(dto.name.map(|n| n.trim().to_string()))
        .bind(dto.address)
        .bind(dto.city)
        .bind(dto.phone)
        .bind(dto.email)
        .bind(dto.siret)
        .bind(dto.vat_number)
        .bind(dto.director_name)
        .bind(dto.currency.map(|c| c.to_uppercase()))
        .bind(dto.logo_url)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Organization not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_organization(db: &PgPool, id: OrganizationId) -> Result<(), AppError> {
        let has_sessions = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE organization_id = $1)",
        )
        .bind(id.into_inner())
        .fetch_one(db)
        .await?;

        if has_sessions {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot delete an organization that still has sessions"
            )));
        }

        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id.into_inner())
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Organization not found"
            )));
        }

        info!(organization.id = %id, "Organization deleted");

        Ok(())
    }
}
