use std::env;

use crate::env_parse;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_token_expiry: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_expiry: i64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),
            access_token_expiry: env_parse("JWT_ACCESS_EXPIRY", 3600),
            refresh_token_expiry: env_parse("JWT_REFRESH_EXPIRY", 604_800),
        }
    }
}
