//! Seed rows and seeding configuration.

use chrono::NaiveDate;
use trainhub_models::{FormationId, OrganizationId, SessionId, StudentId, UserId};

/// Every seeded organization, user and student email uses this domain so
/// `clear-seed` can find them again.
pub const SEED_EMAIL_DOMAIN: &str = "seed.trainhub.test";

pub struct OrganizationSeed {
    pub name: String,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub director_name: String,
}

pub struct TrainerSeed {
    pub organization_id: OrganizationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

pub struct FormationSeed {
    pub organization_id: OrganizationId,
    pub name: String,
    pub code: String,
    pub duration_hours: i32,
    pub price: f64,
}

pub struct SessionSeed {
    pub organization_id: OrganizationId,
    pub formation_id: FormationId,
    pub teacher_id: Option<UserId>,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    pub capacity_max: i32,
    pub price: f64,
}

pub struct StudentSeed {
    pub organization_id: OrganizationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: Option<String>,
}

pub struct EnrollmentSeed {
    pub organization_id: OrganizationId,
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub total_amount: f64,
    pub paid_amount: f64,
}

#[derive(Clone)]
pub struct PerOrganization {
    pub trainers: usize,
    pub formations: usize,
    pub sessions_per_formation: usize,
    pub students: usize,
}

impl Default for PerOrganization {
    fn default() -> Self {
        Self {
            trainers: 3,
            formations: 4,
            sessions_per_formation: 2,
            students: 60,
        }
    }
}

#[derive(Clone, Default)]
pub struct SeedConfig {
    pub organizations: usize,
    pub per_organization: PerOrganization,
}

impl SeedConfig {
    pub fn new(organizations: usize) -> Self {
        Self {
            organizations,
            ..Default::default()
        }
    }

    pub fn with_per_organization(mut self, per_organization: PerOrganization) -> Self {
        self.per_organization = per_organization;
        self
    }

    pub fn total_students(&self) -> usize {
        self.organizations * self.per_organization.students
    }
}
