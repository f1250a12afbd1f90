use sqlx::PgPool;
use tracing::{info, instrument, warn};
use trainhub_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use trainhub_config::JwtConfig;
use trainhub_core::{AppError, verify_password};
use trainhub_models::UserId;
use trainhub_models::users::User;
use uuid::Uuid;

use crate::metrics::{track_jwt_issued, track_user_login_failure, track_user_login_success};
use crate::modules::auth::model::{LoginRequest, LoginResponse};
use crate::modules::users::service::UserService;

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto, jwt_config), fields(email = %dto.email))]
    pub async fn login(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let email = dto.email.trim().to_lowercase();

        let Some(user) = UserService::find_by_email(db, &email).await? else {
            warn!("Login attempt for unknown email");
            track_user_login_failure("unknown_email");
            return Err(AppError::unauthorized(
                "Invalid email or password".to_string(),
            ));
        };

        if !verify_password(&dto.password, &user.password_hash)? {
            warn!(user.id = %user.id, "Login attempt with wrong password");
            track_user_login_failure("invalid_password");
            return Err(AppError::unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        if !user.is_active {
            warn!(user.id = %user.id, "Login attempt on deactivated account");
            track_user_login_failure("inactive");
            return Err(AppError::forbidden(
                "This account has been deactivated".to_string(),
            ));
        }

        track_user_login_success(user.role.as_str());
        info!(user.id = %user.id, role = %user.role, "User logged in");

        Self::issue_tokens(user, jwt_config)
    }

    #[instrument(skip(db, refresh_token, jwt_config))]
    pub async fn refresh(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token".to_string()))?;

        let user = UserService::get_user(db, UserId::from_uuid(user_id), None)
            .await
            .map_err(|_| AppError::unauthorized("Invalid or expired refresh token".to_string()))?;

        if !user.is_active {
            return Err(AppError::forbidden(
                "This account has been deactivated".to_string(),
            ));
        }

        Self::issue_tokens(user, jwt_config)
    }

    fn issue_tokens(user: User, jwt_config: &JwtConfig) -> Result<LoginResponse, AppError> {
        let access_token = create_access_token(
            user.id.into_inner(),
            user.email.as_str(),
            user.organization_id.map(|id| id.into_inner()),
            user.role.as_str(),
            jwt_config,
        )?;
        let refresh_token =
            create_refresh_token(user.id.into_inner(), user.email.as_str(), jwt_config)?;

        track_jwt_issued();

        Ok(LoginResponse {
            access_token,
            refresh_token,
            user,
        })
    }
}
