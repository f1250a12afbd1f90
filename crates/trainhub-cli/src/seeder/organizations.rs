//! Organizations and their trainers.

use std::time::Instant;

use fake::Fake;
use fake::faker::address::fr_fr::{BuildingNumber, CityName, StreetName};
use fake::faker::company::fr_fr::CompanyName;
use fake::faker::name::fr_fr::{FirstName, LastName};
use fake::faker::phone_number::fr_fr::PhoneNumber;
use rayon::prelude::*;
use sqlx::{PgPool, QueryBuilder};
use trainhub_models::users::UserRole;
use trainhub_models::{OrganizationId, UserId};

use super::models::{OrganizationSeed, SEED_EMAIL_DOMAIN, TrainerSeed};
use super::{BATCH_SIZE, email_local_part};

pub fn generate_organizations(count: usize) -> Vec<OrganizationSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let city: String = CityName().fake();
            let street: String = StreetName().fake();
            let building: String = BuildingNumber().fake();
            let company: String = CompanyName().fake();
            let first: String = FirstName().fake();
            let last: String = LastName().fake();

            OrganizationSeed {
                name: format!("{company} Formation"),
                address: format!("{building} {street}"),
                city,
                phone: PhoneNumber().fake(),
                email: format!("contact+{idx}@{SEED_EMAIL_DOMAIN}"),
                director_name: format!("{first} {last}"),
            }
        })
        .collect()
}

pub fn generate_trainers(
    organization_ids: &[OrganizationId],
    per_organization: usize,
) -> Vec<TrainerSeed> {
    organization_ids
        .par_iter()
        .enumerate()
        .flat_map(|(org_idx, &organization_id)| {
            (0..per_organization)
                .map(|idx| {
                    let first_name: String = FirstName().fake();
                    let last_name: String = LastName().fake();
                    let email = format!(
                        "{}.{}+trainer{}@{SEED_EMAIL_DOMAIN}",
                        email_local_part(&first_name),
                        email_local_part(&last_name),
                        org_idx * 1000 + idx
                    );
                    TrainerSeed {
                        organization_id,
                        first_name,
                        last_name,
                        email,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn seed_organizations(db: &PgPool, count: usize) -> anyhow::Result<Vec<OrganizationId>> {
    let start = Instant::now();
    println!("🏢 Seeding {count} organizations...");

    let seeds = generate_organizations(count);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(seeds.len());

    for chunk in seeds.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::new(
            "INSERT INTO organizations (name, address, city, phone, email, director_name) ",
        );
        builder.push_values(chunk, |mut b, org| {
            b.push_bind(&org.name)
                .push_bind(&org.address)
                .push_bind(&org.city)
                .push_bind(&org.phone)
                .push_bind(&org.email)
                .push_bind(&org.director_name);
        });
        builder.push(" RETURNING id");

        let chunk_ids: Vec<OrganizationId> =
            builder.build_query_scalar().fetch_all(&mut *tx).await?;
        ids.extend(chunk_ids);
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} organizations in {:?}", ids.len(), start.elapsed());

    Ok(ids)
}

pub async fn seed_trainers(
    db: &PgPool,
    organization_ids: &[OrganizationId],
    per_organization: usize,
    password_hash: &str,
) -> anyhow::Result<Vec<(OrganizationId, UserId)>> {
    let start = Instant::now();
    let seeds = generate_trainers(organization_ids, per_organization);
    println!("👩‍🏫 Seeding {} trainers...", seeds.len());

    let mut tx = db.begin().await?;
    let mut created = Vec::with_capacity(seeds.len());

    for chunk in seeds.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::new(
            "INSERT INTO users (organization_id, first_name, last_name, email, password_hash, role) ",
        );
        builder.push_values(chunk, |mut b, trainer| {
            b.push_bind(trainer.organization_id)
                .push_bind(&trainer.first_name)
                .push_bind(&trainer.last_name)
                .push_bind(&trainer.email)
                .push_bind(password_hash)
                .push_bind(UserRole::Trainer);
        });
        builder.push(" RETURNING id");

        let ids: Vec<UserId> = builder.build_query_scalar().fetch_all(&mut *tx).await?;
        created.extend(chunk.iter().map(|t| t.organization_id).zip(ids));
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} trainers in {:?}", created.len(), start.elapsed());

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_organizations_use_seed_domain() {
        let orgs = generate_organizations(4);
        assert_eq!(orgs.len(), 4);
        assert!(orgs.iter().all(|o| o.email.ends_with(SEED_EMAIL_DOMAIN)));
    }

    #[test]
    fn test_trainer_emails_are_unique() {
        let ids = vec![OrganizationId::new(), OrganizationId::new()];
        let trainers = generate_trainers(&ids, 3);
        let mut emails: Vec<_> = trainers.iter().map(|t| t.email.clone()).collect();
        emails.sort();
        emails.dedup();
        assert_eq!(emails.len(), 6);
    }
}
