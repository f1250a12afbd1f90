//! # TrainHub API
//!
//! Back office for training organizations, built with Axum and PostgreSQL.
//! It covers the life of a training session from the catalog to the final
//! report:
//!
//! - **Catalog**: formations and the programs attached to their sessions
//! - **Sessions**: scheduling, half-day slots and capacity
//! - **Enrollments**: learners, seat checks, payments and invoices
//! - **Follow-up**: attendance, grades and e-learning progress
//! - **Documents**: contracts, convocations and reports as PDF, bulk ZIP
//!   archives built in the background and delivery by email
//! - **Reports**: per-session report, CSV export and organization dashboard
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── middleware/       # JWT and permission extractors
//! ├── modules/          # Feature modules
//! │   ├── auth/        # Login, refresh, current user
//! │   ├── sessions/    # Session CRUD and status
//! │   ├── slots/       # Slot generation and editing
//! │   ├── enrollments/ # Enrollment and capacity rules
//! │   ├── documents/   # PDF, ZIP and email generation
//! │   └── ...
//! └── utils/           # Scoping helpers and SMTP delivery
//! ```
//!
//! Each feature module follows the same layout:
//!
//! - `mod.rs`: module exports
//! - `controller.rs`: HTTP handlers
//! - `service.rs`: business logic and queries
//! - `model.rs`: re-exports from `trainhub-models`
//! - `router.rs`: Axum router configuration
//!
//! ## Access model
//!
//! ```text
//! System Admin (CLI-created, no organization)
//!     ↓ creates
//! Organizations + Admins (organization_id assigned)
//!     ↓ create
//! Trainers, staff, learners and sessions (inherit organization_id)
//! ```
//!
//! Every handler takes a `Require*` extractor for one permission; queries are
//! then scoped to the caller's organization, and rows from another
//! organization read as not found.
//!
//! ## API Documentation
//!
//! - Swagger UI: `http://localhost:3000/swagger-ui`
//! - Scalar: `http://localhost:3000/scalar`

pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;

// Re-export workspace crates for convenience
pub use trainhub_auth;
pub use trainhub_cache;
pub use trainhub_config;
pub use trainhub_core;
pub use trainhub_db;
pub use trainhub_models;
