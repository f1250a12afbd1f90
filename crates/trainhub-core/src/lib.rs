//! # TrainHub Core
//!
//! Foundational types shared by every TrainHub crate:
//!
//! - [`errors`]: the [`AppError`] type and its HTTP response conversion
//! - [`pagination`]: page/offset query parameters and response metadata
//! - [`permissions`]: permission names and the role → permission mapping
//! - [`password`]: bcrypt hashing helpers
//! - [`serde`]: lenient deserializers for query strings
//! - [`file_storage`]: storage backends for generated documents and archives

pub mod errors;
pub mod file_storage;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
