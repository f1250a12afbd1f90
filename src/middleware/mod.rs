//! Authentication and permission extractors.
//!
//! 1. The client sends `Authorization: Bearer <token>`
//! 2. [`auth::AuthUser`] validates the JWT and exposes its claims
//! 3. A `Require*` extractor checks one permission from the claims
//!
//! ```ignore
//! use crate::middleware::auth::RequireSessionsCreate;
//!
//! async fn create_session(
//!     RequireSessionsCreate(auth_user): RequireSessionsCreate,
//! ) -> impl IntoResponse {
//!     // only runs with "sessions:create"
//! }
//! ```

pub mod auth;
