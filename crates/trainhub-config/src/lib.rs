//! # TrainHub Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`jwt`]: token signing secret and lifetimes
//! - [`cors`]: allowed origins
//! - [`email`]: SMTP transport and sender identity
//! - [`rate_limit`]: request throttling for authentication endpoints
//! - [`documents`]: where generated archives are stored and served from
//!
//! ```ignore
//! use trainhub_config::{DocumentsConfig, JwtConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let documents_config = DocumentsConfig::from_env();
//! ```

pub mod cors;
pub mod documents;
pub mod email;
pub mod jwt;
pub mod rate_limit;

pub use cors::CorsConfig;
pub use documents::DocumentsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use rate_limit::RateLimitConfig;

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
