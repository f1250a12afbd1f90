use sqlx::PgPool;
use tracing::{info, instrument};
use trainhub_core::{AppError, PaginationMeta, hash_password};
use trainhub_models::{OrganizationId, UserId};

use crate::metrics::track_user_created;

use super::model::{CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserFilterParams};

fn map_email_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!("A user with this email already exists"));
    }
    AppError::from(e)
}

pub struct UserService;

impl UserService {
    /// Creates a staff account. `organization_id` is `None` only for system
    /// admins.
    #[instrument(skip(db, dto), fields(email = %dto.email, role = %dto.role))]
    pub async fn create_user(
        db: &PgPool,
        organization_id: Option<OrganizationId>,
        dto: CreateUserDto,
    ) -> Result<User, AppError> {
        let password_hash = hash_password(&dto.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (organization_id, first_name, last_name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id.map(|id| id.into_inner()))
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(dto.email.as_str())
        .bind(password_hash)
        .bind(dto.role)
        .fetch_one(db)
        .await
        .map_err(map_email_conflict)?;

        track_user_created(user.role.as_str());
        info!(user.id = %user.id, "User created");

        Ok(user)
    }

    #[instrument(skip(db))]
    pub async fn get_users(
        db: &PgPool,
        scope: Option<OrganizationId>,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let organization = scope
            .map(|id| id.into_inner())
            .or(filters.organization_id);

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::uuid IS NULL OR organization_id = $1)
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3::boolean IS NULL OR is_active = $3)
            ORDER BY last_name, first_name
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(organization)
        .bind(filters.role)
        .bind(filters.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::uuid IS NULL OR organization_id = $1)
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3::boolean IS NULL OR is_active = $3)
            "#,
        )
        .bind(organization)
        .bind(filters.role)
        .bind(filters.is_active)
        .fetch_one(db)
        .await?;

        Ok(PaginatedUsersResponse {
            data: users,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_user(
        db: &PgPool,
        id: UserId,
        scope: Option<OrganizationId>,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND ($2::uuid IS NULL OR organization_id = $2)",
        )
        .bind(id.into_inner())
        .bind(scope.map(|id| id.into_inner()))
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_user(
        db: &PgPool,
        id: UserId,
        scope: Option<OrganizationId>,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        let existing = Self::get_user(db, id, scope).await?;

        if existing.organization_id.is_some()
            && dto.role == Some(super::model::UserRole::SystemAdmin)
        {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Organization members cannot be promoted to system admin"
            )));
        }

        let password_hash = dto.password.as_deref().map(hash_password).transpose()?;

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                password_hash = COALESCE($5, password_hash),
                role = COALESCE($6, role),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.into_inner())
        .bind(dto.first_name.map(|n| n.trim().to_string()))
        .bind(dto.last_name.map(|n| n.trim().to_string()))
        .bind(dto.email.map(|e| e.into_inner()))
        .bind(password_hash)
        .bind(dto.role)
        .bind(dto.is_active)
        .fetch_one(db)
        .await
        .map_err(map_email_conflict)
    }

    /// Users are never hard-deleted; their id stays referenced by payments
    /// and attendance records.
    #[instrument(skip(db))]
    pub async fn deactivate_user(
        db: &PgPool,
        id: UserId,
        scope: Option<OrganizationId>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR organization_id = $2)
            "#,
        )
        .bind(id.into_inner())
        .bind(scope.map(|id| id.into_inner()))
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("User not found")));
        }

        info!(user.id = %id, "User deactivated");

        Ok(())
    }
}
