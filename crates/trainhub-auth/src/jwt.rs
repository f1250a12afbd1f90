//! Token creation and verification.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use trainhub_config::JwtConfig;
use trainhub_core::AppError;
use trainhub_core::permissions::permissions_for_role;

use crate::claims::{Claims, RefreshTokenClaims};

/// Creates an access token. Permissions are resolved from `role` at issue
/// time.
pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    organization_id: Option<Uuid>,
    role: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        organization_id,
        role: role.to_string(),
        permissions: permissions_for_role(role),
        exp: now + jwt_config.access_token_expiry as usize,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token".to_string()))
}

pub fn create_refresh_token(
    user_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = RefreshTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: now + jwt_config.refresh_token_expiry as usize,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create refresh token: {}", e)))
}

pub fn verify_refresh_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<RefreshTokenClaims, AppError> {
    decode::<RefreshTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired refresh token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604_800,
        }
    }

    #[test]
    fn test_access_token_embeds_role_permissions() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();

        let token =
            create_access_token(user_id, "manager@acme.test", Some(org_id), "manager", &config)
                .unwrap();
        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.organization_id, Some(org_id));
        assert_eq!(claims.role, "manager");
        assert!(claims.has_permission("enrollments:create"));
        assert!(!claims.has_permission("organizations:create"));
    }

    #[test]
    fn test_verify_token_rejects_garbage_and_wrong_secret() {
        let config = test_config();
        assert!(verify_token("invalid-token", &config).is_err());

        let token =
            create_access_token(Uuid::new_v4(), "a@b.test", None, "system_admin", &config)
                .unwrap();
        let other = JwtConfig {
            secret: "another-secret-key-at-least-32-characters".to_string(),
            ..config
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_refresh_token_outlives_access_token() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let access = create_access_token(user_id, "a@b.test", None, "admin", &config).unwrap();
        let refresh = create_refresh_token(user_id, "a@b.test", &config).unwrap();

        let access_claims = verify_token(&access, &config).unwrap();
        let refresh_claims = verify_refresh_token(&refresh, &config).unwrap();
        assert!(refresh_claims.exp > access_claims.exp);
        assert_eq!(refresh_claims.sub, user_id.to_string());
    }

    #[test]
    fn test_access_token_is_not_a_refresh_token() {
        let config = test_config();
        let access =
            create_access_token(Uuid::new_v4(), "a@b.test", None, "admin", &config).unwrap();
        // Access claims have no jti, so they cannot decode as refresh claims.
        assert!(verify_refresh_token(&access, &config).is_err());
    }
}
