//! # TrainHub Auth
//!
//! JWT claims and token helpers.
//!
//! - **Access token** ([`Claims`]): carries the user's organization, role and
//!   permissions so handlers can authorize without a database lookup.
//! - **Refresh token** ([`RefreshTokenClaims`]): exchanged for a new token pair.
//!
//! ```ignore
//! use trainhub_auth::{create_access_token, verify_token};
//!
//! let token = create_access_token(user_id, "admin@acme.test", Some(org_id), "admin", &config)?;
//! let claims = verify_token(&token, &config)?;
//! ```

pub mod claims;
pub mod jwt;

pub use claims::{Claims, RefreshTokenClaims};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
