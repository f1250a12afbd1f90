use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use trainhub_core::AppError;
use trainhub_core::permissions::roles;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    /// Organization scope (None for system admins)
    pub organization_id: Option<Uuid>,
    /// One of `system_admin`, `admin`, `manager`, `trainer`
    pub role: String,
    /// Permission names granted by the role
    pub permissions: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token".to_string()))
    }

    pub fn is_system_admin(&self) -> bool {
        self.role == roles::SYSTEM_ADMIN
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Refresh token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    /// Unique token id so two refresh tokens issued in the same second differ
    pub jti: String,
}
