//! # TrainHub Models
//!
//! Database entities, request/response DTOs and validation schemas for the
//! TrainHub API.
//!
//! # Modules
//!
//! - [`ids`]: typed `Uuid` identifiers
//! - [`value_types`]: validated value types (email)
//! - [`organizations`], [`users`], [`auth`]: tenants, staff accounts, login
//! - [`students`], [`formations`], [`programs`]: learners and the catalog
//! - [`sessions`], [`slots`], [`enrollments`]: session planning and registration
//! - [`documents`]: generated documents and bulk archive jobs
//! - [`signatures`]: signature requests for conventions and contracts
//! - [`elearning`], [`attendance`], [`grades`]: learning follow-up
//! - [`payments`], [`reports`]: finances and reporting
//!
//! # Example
//!
//! ```ignore
//! use trainhub_models::enrollments::{EnrollmentStatus, PaymentStatus};
//!
//! let status = PaymentStatus::from_amounts(150.0, 300.0);
//! assert_eq!(status, PaymentStatus::Partial);
//! ```

pub mod attendance;
pub mod auth;
pub mod documents;
pub mod elearning;
pub mod enrollments;
pub mod formations;
pub mod grades;
pub mod ids;
pub mod organizations;
pub mod payments;
pub mod programs;
pub mod reports;
pub mod sessions;
pub mod signatures;
pub mod slots;
pub mod students;
pub mod time_format;
pub mod users;
pub mod value_types;

pub use auth::{LoginRequest, LoginResponse, MessageResponse, RefreshTokenRequest};
pub use ids::*;
pub use value_types::Email;
