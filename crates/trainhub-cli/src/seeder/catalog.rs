//! Formations and scheduled sessions.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{Days, Local, NaiveDate};
use fake::Fake;
use fake::faker::address::fr_fr::CityName;
use rayon::prelude::*;
use sqlx::{PgPool, QueryBuilder};
use trainhub_models::sessions::SessionStatus;
use trainhub_models::{FormationId, OrganizationId, SessionId, UserId};

use super::BATCH_SIZE;
use super::models::{FormationSeed, SessionSeed};

const FORMATION_TITLES: &[&str] = &[
    "Sécurité incendie",
    "Gestion de projet agile",
    "Excel avancé",
    "Management d'équipe",
    "Premiers secours",
    "Comptabilité SYSCOHADA",
    "Marketing digital",
    "Anglais professionnel",
];

pub fn generate_formations(
    organization_ids: &[OrganizationId],
    per_organization: usize,
) -> Vec<FormationSeed> {
    organization_ids
        .par_iter()
        .flat_map(|&organization_id| {
            (0..per_organization)
                .map(|idx| {
                    let title = FORMATION_TITLES[idx % FORMATION_TITLES.len()];
                    let duration_hours: i32 = (7..40).fake();
                    let price: i32 = (50..500).fake();
                    FormationSeed {
                        organization_id,
                        name: title.to_string(),
                        code: format!("FOR-{:03}", idx + 1),
                        duration_hours,
                        price: f64::from(price * 1000),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Spreads sessions from a month ago to three months ahead so every status
/// shows up on the dashboard.
pub fn generate_sessions(
    formations: &[(OrganizationId, FormationId, f64)],
    trainers: &HashMap<OrganizationId, Vec<UserId>>,
    per_formation: usize,
    today: NaiveDate,
) -> Vec<SessionSeed> {
    let first_day = today.checked_sub_days(Days::new(30)).unwrap_or(today);

    formations
        .par_iter()
        .enumerate()
        .flat_map(|(formation_idx, &(organization_id, formation_id, price))| {
            let org_trainers = trainers.get(&organization_id);
            (0..per_formation)
                .map(|idx| {
                    let offset: u64 = (0..120).fake();
                    let length: u64 = (0..5).fake();
                    let start_date = first_day.checked_add_days(Days::new(offset)).unwrap_or(first_day);
                    let end_date = start_date.checked_add_days(Days::new(length)).unwrap_or(start_date);
                    let teacher_id = org_trainers
                        .filter(|t| !t.is_empty())
                        .map(|t| t[(formation_idx + idx) % t.len()]);
                    let capacity_max: i32 = (8..25).fake();
                    let city: String = CityName().fake();

                    SessionSeed {
                        organization_id,
                        formation_id,
                        teacher_id,
                        name: format!("Session {} - {}", idx + 1, start_date.format("%d/%m/%Y")),
                        start_date,
                        end_date,
                        location: city,
                        capacity_max,
                        price,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn seed_formations(
    db: &PgPool,
    organization_ids: &[OrganizationId],
    per_organization: usize,
) -> anyhow::Result<Vec<(OrganizationId, FormationId, f64)>> {
    let start = Instant::now();
    let seeds = generate_formations(organization_ids, per_organization);
    println!("📘 Seeding {} formations...", seeds.len());

    let mut tx = db.begin().await?;
    let mut created = Vec::with_capacity(seeds.len());

    for chunk in seeds.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::new(
            "INSERT INTO formations (organization_id, name, code, duration_hours, price) ",
        );
        builder.push_values(chunk, |mut b, f| {
            b.push_bind(f.organization_id)
                .push_bind(&f.name)
                .push_bind(&f.code)
                .push_bind(f.duration_hours)
                .push_bind(f.price);
        });
        builder.push(" RETURNING id");

        let ids: Vec<FormationId> = builder.build_query_scalar().fetch_all(&mut *tx).await?;
        created.extend(
            chunk
                .iter()
                .zip(ids)
                .map(|(f, id)| (f.organization_id, id, f.price)),
        );
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} formations in {:?}", created.len(), start.elapsed());

    Ok(created)
}

pub async fn seed_sessions(
    db: &PgPool,
    formations: &[(OrganizationId, FormationId, f64)],
    trainers: &HashMap<OrganizationId, Vec<UserId>>,
    per_formation: usize,
) -> anyhow::Result<Vec<(OrganizationId, SessionId, i32, f64)>> {
    let start = Instant::now();
    let today = Local::now().date_naive();
    let seeds = generate_sessions(formations, trainers, per_formation, today);
    println!("📅 Seeding {} sessions...", seeds.len());

    let mut tx = db.begin().await?;
    let mut created = Vec::with_capacity(seeds.len());

    for chunk in seeds.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::new(
            "INSERT INTO sessions (organization_id, formation_id, teacher_id, name, start_date, \
             end_date, location, capacity_max, price, status) ",
        );
        builder.push_values(chunk, |mut b, s| {
            let status = if s.end_date < today {
                SessionStatus::Completed
            } else if s.start_date <= today {
                SessionStatus::Ongoing
            } else {
                SessionStatus::Planned
            };
            b.push_bind(s.organization_id)
                .push_bind(s.formation_id)
                .push_bind(s.teacher_id)
                .push_bind(&s.name)
                .push_bind(s.start_date)
                .push_bind(s.end_date)
                .push_bind(&s.location)
                .push_bind(s.capacity_max)
                .push_bind(s.price)
                .push_bind(status);
        });
        builder.push(" RETURNING id");

        let ids: Vec<SessionId> = builder.build_query_scalar().fetch_all(&mut *tx).await?;
        created.extend(
            chunk
                .iter()
                .zip(ids)
                .map(|(s, id)| (s.organization_id, id, s.capacity_max, s.price)),
        );
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} sessions in {:?}", created.len(), start.elapsed());

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_sessions_have_valid_ranges() {
        let org = OrganizationId::new();
        let formations = vec![(org, FormationId::new(), 150_000.0)];
        let trainers = HashMap::from([(org, vec![UserId::new()])]);
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let sessions = generate_sessions(&formations, &trainers, 10, today);
        assert_eq!(sessions.len(), 10);
        for s in &sessions {
            assert!(s.end_date >= s.start_date);
            assert!(s.capacity_max > 0);
            assert!(s.teacher_id.is_some());
        }
    }

    #[test]
    fn test_formation_codes_are_unique_per_organization() {
        let formations = generate_formations(&[OrganizationId::new()], 12);
        let mut codes: Vec<_> = formations.iter().map(|f| f.code.as_str()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 12);
    }
}
