use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use trainhub_auth::{Claims, verify_token};
use trainhub_core::AppError;
use trainhub_core::permissions as p;
use trainhub_models::{OrganizationId, UserId};

use crate::state::AppState;

/// Extractor that validates the bearer token and exposes its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.0.has_permission(permission)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|perm| self.has_permission(perm))
    }

    pub fn is_system_admin(&self) -> bool {
        self.0.is_system_admin()
    }

    /// The caller's organization (None for system admins).
    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.0.organization_id.map(OrganizationId::from_uuid)
    }

    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0.user_id().map(UserId::from_uuid)
    }

    pub fn role(&self) -> &str {
        &self.0.role
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid authorization header format".to_string())
        })?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Declares an extractor that authenticates the caller and then demands one
/// permission.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = trainhub_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if !auth_user.has_permission($permission) {
                    return Err(trainhub_core::AppError::forbidden(format!(
                        "Access denied. Missing required permission: {}",
                        $permission
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_permission!(RequireOrganizationsCreate, p::ORGANIZATIONS_CREATE);
require_permission!(RequireOrganizationsRead, p::ORGANIZATIONS_READ);
require_permission!(RequireOrganizationsUpdate, p::ORGANIZATIONS_UPDATE);
require_permission!(RequireOrganizationsDelete, p::ORGANIZATIONS_DELETE);

require_permission!(RequireUsersCreate, p::USERS_CREATE);
require_permission!(RequireUsersRead, p::USERS_READ);
require_permission!(RequireUsersUpdate, p::USERS_UPDATE);
require_permission!(RequireUsersDelete, p::USERS_DELETE);

require_permission!(RequireStudentsCreate, p::STUDENTS_CREATE);
require_permission!(RequireStudentsRead, p::STUDENTS_READ);
require_permission!(RequireStudentsUpdate, p::STUDENTS_UPDATE);
require_permission!(RequireStudentsDelete, p::STUDENTS_DELETE);

require_permission!(RequireFormationsCreate, p::FORMATIONS_CREATE);
require_permission!(RequireFormationsRead, p::FORMATIONS_READ);
require_permission!(RequireFormationsUpdate, p::FORMATIONS_UPDATE);
require_permission!(RequireFormationsDelete, p::FORMATIONS_DELETE);

require_permission!(RequireProgramsCreate, p::PROGRAMS_CREATE);
require_permission!(RequireProgramsRead, p::PROGRAMS_READ);
require_permission!(RequireProgramsUpdate, p::PROGRAMS_UPDATE);
require_permission!(RequireProgramsDelete, p::PROGRAMS_DELETE);

require_permission!(RequireSessionsCreate, p::SESSIONS_CREATE);
require_permission!(RequireSessionsRead, p::SESSIONS_READ);
require_permission!(RequireSessionsUpdate, p::SESSIONS_UPDATE);
require_permission!(RequireSessionsDelete, p::SESSIONS_DELETE);
require_permission!(RequireSlotsManage, p::SLOTS_MANAGE);
require_permission!(RequireSlotsRead, p::SLOTS_READ);

require_permission!(RequireEnrollmentsCreate, p::ENROLLMENTS_CREATE);
require_permission!(RequireEnrollmentsRead, p::ENROLLMENTS_READ);
require_permission!(RequireEnrollmentsUpdate, p::ENROLLMENTS_UPDATE);
require_permission!(RequireEnrollmentsDelete, p::ENROLLMENTS_DELETE);

require_permission!(RequireDocumentsGenerate, p::DOCUMENTS_GENERATE);
require_permission!(RequireDocumentsSend, p::DOCUMENTS_SEND);
require_permission!(RequireSignaturesSend, p::SIGNATURES_SEND);
require_permission!(RequireSignaturesRead, p::SIGNATURES_READ);

require_permission!(RequireElearningManage, p::ELEARNING_MANAGE);
require_permission!(RequireElearningRead, p::ELEARNING_READ);
require_permission!(RequireAttendanceRecord, p::ATTENDANCE_RECORD);
require_permission!(RequireAttendanceRead, p::ATTENDANCE_READ);
require_permission!(RequireGradesManage, p::GRADES_MANAGE);
require_permission!(RequireGradesRead, p::GRADES_READ);

require_permission!(RequirePaymentsCreate, p::PAYMENTS_CREATE);
require_permission!(RequirePaymentsRead, p::PAYMENTS_READ);
require_permission!(RequirePaymentsDelete, p::PAYMENTS_DELETE);
require_permission!(RequireInvoicesCreate, p::INVOICES_CREATE);

require_permission!(RequireReportsView, p::REPORTS_VIEW);
require_permission!(RequireReportsExport, p::REPORTS_EXPORT);
