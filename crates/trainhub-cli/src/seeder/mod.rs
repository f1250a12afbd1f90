//! Demo data generation.
//!
//! Rows are generated in parallel with rayon, then inserted in multi-row
//! batches inside one transaction per table.

mod catalog;
mod models;
mod organizations;
mod students;

use std::collections::HashMap;
use std::time::Instant;

use sqlx::PgPool;
use trainhub_core::hash_password;
use trainhub_models::{OrganizationId, UserId};
use uuid::Uuid;

pub use catalog::{generate_formations, generate_sessions};
pub use models::{PerOrganization, SEED_EMAIL_DOMAIN, SeedConfig};
pub use organizations::{generate_organizations, generate_trainers};
pub use students::{generate_enrollments, generate_students};

/// Rows per multi-value INSERT, kept well under the Postgres bind limit.
const BATCH_SIZE: usize = 500;

/// Password of every seeded trainer account.
pub const SEED_PASSWORD: &str = "password123";

/// ASCII lower-case form of a name, for generated email addresses.
fn email_local_part(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' | 'É' => Some('e'),
            'à' | 'â' | 'ä' => Some('a'),
            'î' | 'ï' => Some('i'),
            'ô' | 'ö' => Some('o'),
            'ù' | 'û' | 'ü' => Some('u'),
            'ç' => Some('c'),
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect()
}

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> anyhow::Result<()> {
    let start = Instant::now();
    let per_org = &config.per_organization;
    println!(
        "🌱 Seeding {} organizations ({} students in total)\n",
        config.organizations,
        config.total_students()
    );

    let password_hash =
        hash_password(SEED_PASSWORD).map_err(|e| anyhow::anyhow!("{}", e.error))?;

    let organization_ids = organizations::seed_organizations(db, config.organizations).await?;

    let trainers =
        organizations::seed_trainers(db, &organization_ids, per_org.trainers, &password_hash)
            .await?;
    let mut trainers_by_org: HashMap<OrganizationId, Vec<UserId>> = HashMap::new();
    for (organization_id, user_id) in trainers {
        trainers_by_org.entry(organization_id).or_default().push(user_id);
    }

    let formations = catalog::seed_formations(db, &organization_ids, per_org.formations).await?;
    let sessions = catalog::seed_sessions(
        db,
        &formations,
        &trainers_by_org,
        per_org.sessions_per_formation,
    )
    .await?;

    let students_by_org = students::seed_students(db, &organization_ids, per_org.students).await?;
    students::seed_enrollments(db, &sessions, &students_by_org).await?;

    println!("\n✅ Seeding finished in {:?}", start.elapsed());
    println!("   Trainer accounts use the password `{SEED_PASSWORD}`");

    Ok(())
}

/// Deletes every organization created by the seeder together with its data.
/// Accounts created through `create-admin` are left alone.
pub async fn clear_all(db: &PgPool) -> anyhow::Result<u64> {
    let start = Instant::now();
    println!("🗑️  Clearing seeded data...");

    let pattern = format!("%@{SEED_EMAIL_DOMAIN}");
    let mut tx = db.begin().await?;

    let organization_ids: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM organizations WHERE email LIKE $1")
            .bind(&pattern)
            .fetch_all(&mut *tx)
            .await?;

    // Restricting foreign keys first, then the organizations cascade.
    for table in ["payments", "invoices", "enrollments", "sessions", "formations"] {
        sqlx::query(&format!(
            "DELETE FROM {table} WHERE organization_id = ANY($1)"
        ))
        .bind(&organization_ids)
        .execute(&mut *tx)
        .await?;
    }

    let deleted = sqlx::query("DELETE FROM organizations WHERE id = ANY($1)")
        .bind(&organization_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    println!("   ✓ Deleted {deleted} organizations in {:?}", start.elapsed());

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_local_part_strips_accents_and_spaces() {
        assert_eq!(email_local_part("Hélène"), "helene");
        assert_eq!(email_local_part("Le Goff"), "legoff");
        assert_eq!(email_local_part("N'Diaye"), "ndiaye");
    }
}
