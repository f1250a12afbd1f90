//! Administrator bootstrap.

use anyhow::{Context, bail};
use sqlx::PgPool;
use trainhub_core::hash_password;
use trainhub_models::users::UserRole;
use trainhub_models::value_types::Email;
use trainhub_models::{OrganizationId, UserId};

pub struct NewAdmin {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Creates an organization and an `admin` of it; `None` creates a
    /// `system_admin` with no organization.
    pub organization_name: Option<String>,
}

#[derive(Debug)]
pub struct CreatedAdmin {
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub role: UserRole,
}

pub async fn create_admin(db: &PgPool, admin: NewAdmin) -> anyhow::Result<CreatedAdmin> {
    if admin.password.len() < 8 {
        bail!("Password must be at least 8 characters");
    }
    let email = Email::new(&admin.email).context("Invalid email address")?;
    let password_hash =
        hash_password(&admin.password).map_err(|e| anyhow::anyhow!("{}", e.error))?;

    let mut tx = db.begin().await?;

    let organization_id = match admin.organization_name.as_deref() {
        Some(name) => {
            let id: OrganizationId =
                sqlx::query_scalar("INSERT INTO organizations (name) VALUES ($1) RETURNING id")
                    .bind(name.trim())
                    .fetch_one(&mut *tx)
                    .await?;
            Some(id)
        }
        None => None,
    };

    let role = if organization_id.is_some() {
        UserRole::Admin
    } else {
        UserRole::SystemAdmin
    };

    let user_id: Option<UserId> = sqlx::query_scalar(
        r#"
        INSERT INTO users (organization_id, first_name, last_name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(admin.first_name.trim())
    .bind(admin.last_name.trim())
    .bind(&email)
    .bind(&password_hash)
    .bind(role)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user_id) = user_id else {
        tx.rollback().await?;
        bail!("A user with this email already exists");
    };

    tx.commit().await?;

    Ok(CreatedAdmin {
        user_id,
        organization_id,
        role,
    })
}
