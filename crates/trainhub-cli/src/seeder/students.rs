//! Learners and their enrollments.

use std::collections::HashMap;
use std::time::Instant;

use fake::Fake;
use fake::faker::company::fr_fr::CompanyName;
use fake::faker::name::fr_fr::{FirstName, LastName};
use fake::faker::phone_number::fr_fr::PhoneNumber;
use rayon::prelude::*;
use sqlx::{PgPool, QueryBuilder};
use trainhub_models::enrollments::PaymentStatus;
use trainhub_models::{OrganizationId, SessionId, StudentId};

use super::models::{EnrollmentSeed, SEED_EMAIL_DOMAIN, StudentSeed};
use super::{BATCH_SIZE, email_local_part};

pub fn generate_students(
    organization_ids: &[OrganizationId],
    per_organization: usize,
) -> Vec<StudentSeed> {
    organization_ids
        .par_iter()
        .enumerate()
        .flat_map(|(org_idx, &organization_id)| {
            (0..per_organization)
                .map(|idx| {
                    let first_name: String = FirstName().fake();
                    let last_name: String = LastName().fake();
                    let employed: bool = (0..3).fake::<u8>() > 0;
                    let email = format!(
                        "{}.{}+{}@{SEED_EMAIL_DOMAIN}",
                        email_local_part(&first_name),
                        email_local_part(&last_name),
                        org_idx * 100_000 + idx
                    );

                    StudentSeed {
                        organization_id,
                        first_name,
                        last_name,
                        email,
                        phone: PhoneNumber().fake(),
                        company_name: employed.then(|| CompanyName().fake()),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Fills each session up to a random share of its capacity, picking distinct
/// learners of the same organization.
pub fn generate_enrollments(
    sessions: &[(OrganizationId, SessionId, i32, f64)],
    students: &HashMap<OrganizationId, Vec<StudentId>>,
) -> Vec<EnrollmentSeed> {
    sessions
        .par_iter()
        .enumerate()
        .flat_map(|(session_idx, &(organization_id, session_id, capacity, price))| {
            let Some(pool) = students.get(&organization_id).filter(|p| !p.is_empty()) else {
                return Vec::new();
            };
            let wanted: usize = (0..=capacity.max(0) as usize).fake();
            let count = wanted.min(pool.len());

            pool.iter()
                .cycle()
                .skip(session_idx * 7 % pool.len())
                .take(count)
                .map(|&student_id| {
                    let paid_share: u8 = (0..=2).fake();
                    let paid_amount = price * f64::from(paid_share) / 2.0;
                    EnrollmentSeed {
                        organization_id,
                        session_id,
                        student_id,
                        total_amount: price,
                        paid_amount,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn seed_students(
    db: &PgPool,
    organization_ids: &[OrganizationId],
    per_organization: usize,
) -> anyhow::Result<HashMap<OrganizationId, Vec<StudentId>>> {
    let start = Instant::now();
    let seeds = generate_students(organization_ids, per_organization);
    println!("🎓 Seeding {} students...", seeds.len());

    let mut tx = db.begin().await?;
    let mut by_organization: HashMap<OrganizationId, Vec<StudentId>> = HashMap::new();

    for chunk in seeds.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::new(
            "INSERT INTO students (organization_id, first_name, last_name, email, phone, company_name) ",
        );
        builder.push_values(chunk, |mut b, s| {
            b.push_bind(s.organization_id)
                .push_bind(&s.first_name)
                .push_bind(&s.last_name)
                .push_bind(&s.email)
                .push_bind(&s.phone)
                .push_bind(&s.company_name);
        });
        builder.push(" RETURNING id");

        let ids: Vec<StudentId> = builder.build_query_scalar().fetch_all(&mut *tx).await?;
        for (seed, id) in chunk.iter().zip(ids) {
            by_organization.entry(seed.organization_id).or_default().push(id);
        }
    }

    tx.commit().await?;
    let total: usize = by_organization.values().map(Vec::len).sum();
    println!("   ✓ Inserted {} students in {:?}", total, start.elapsed());

    Ok(by_organization)
}

pub async fn seed_enrollments(
    db: &PgPool,
    sessions: &[(OrganizationId, SessionId, i32, f64)],
    students: &HashMap<OrganizationId, Vec<StudentId>>,
) -> anyhow::Result<usize> {
    let start = Instant::now();
    let seeds = generate_enrollments(sessions, students);
    println!("📝 Seeding {} enrollments...", seeds.len());

    let mut tx = db.begin().await?;

    for chunk in seeds.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::new(
            "INSERT INTO enrollments (organization_id, session_id, student_id, total_amount, \
             paid_amount, payment_status) ",
        );
        builder.push_values(chunk, |mut b, e| {
            b.push_bind(e.organization_id)
                .push_bind(e.session_id)
                .push_bind(e.student_id)
                .push_bind(e.total_amount)
                .push_bind(e.paid_amount)
                .push_bind(PaymentStatus::from_amounts(e.paid_amount, e.total_amount));
        });
        builder.push(" ON CONFLICT (session_id, student_id) DO NOTHING");
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} enrollments in {:?}", seeds.len(), start.elapsed());

    Ok(seeds.len())
}
