use trainhub_core::AppError;
use trainhub_models::OrganizationId;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;

/// Organization for operations that create or list organization-scoped
/// records. System admins must name one; everyone else uses their own and
/// any `specified` value is ignored.
pub fn organization_for_scoped_operation(
    auth_user: &AuthUser,
    specified: Option<Uuid>,
) -> Result<OrganizationId, AppError> {
    if auth_user.is_system_admin() {
        return specified.map(OrganizationId::from_uuid).ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "System admin must specify organization_id for this operation"
            ))
        });
    }

    auth_user.organization_id().ok_or_else(|| {
        AppError::forbidden("User must be associated with an organization".to_string())
    })
}

/// Scope for operations on an existing record (get, update, delete).
/// System admins get `None` and may touch any organization's records.
pub fn resource_scope(auth_user: &AuthUser) -> Result<Option<OrganizationId>, AppError> {
    if auth_user.is_system_admin() {
        return Ok(None);
    }

    auth_user.organization_id().map(Some).ok_or_else(|| {
        AppError::forbidden("User must be associated with an organization".to_string())
    })
}

/// Rejects records that belong to another organization. The error is a 404
/// so callers cannot probe for ids outside their organization.
pub fn ensure_in_scope(
    scope: Option<OrganizationId>,
    owner: OrganizationId,
    entity: &str,
) -> Result<(), AppError> {
    match scope {
        Some(org) if org != owner => Err(AppError::not_found(anyhow::anyhow!(
            "{} not found",
            entity
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainhub_auth::Claims;
    use trainhub_core::permissions::{permissions_for_role, roles};

    fn auth_user(role: &str, organization_id: Option<Uuid>) -> AuthUser {
        AuthUser(Claims {
            sub: Uuid::new_v4().to_string(),
            email: "staff@acme.test".to_string(),
            organization_id,
            role: role.to_string(),
            permissions: permissions_for_role(role),
            exp: 9_999_999_999,
            iat: 1_234_567_890,
        })
    }

    #[test]
    fn test_system_admin_must_specify_organization() {
        let root = auth_user(roles::SYSTEM_ADMIN, None);
        let err = organization_for_scoped_operation(&root, None).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);

        let org = Uuid::new_v4();
        assert_eq!(
            organization_for_scoped_operation(&root, Some(org)).unwrap(),
            OrganizationId::from_uuid(org)
        );
    }

    #[test]
    fn test_staff_always_use_their_own_organization() {
        let own = Uuid::new_v4();
        let admin = auth_user(roles::ADMIN, Some(own));
        let resolved = organization_for_scoped_operation(&admin, Some(Uuid::new_v4())).unwrap();
        assert_eq!(resolved, OrganizationId::from_uuid(own));
    }

    #[test]
    fn test_resource_scope() {
        assert_eq!(
            resource_scope(&auth_user(roles::SYSTEM_ADMIN, None)).unwrap(),
            None
        );

        let org = Uuid::new_v4();
        assert_eq!(
            resource_scope(&auth_user(roles::TRAINER, Some(org))).unwrap(),
            Some(OrganizationId::from_uuid(org))
        );

        let orphan = auth_user(roles::MANAGER, None);
        assert!(resource_scope(&orphan).is_err());
    }

    #[test]
    fn test_ensure_in_scope() {
        let org = OrganizationId::new();
        assert!(ensure_in_scope(None, org, "Session").is_ok());
        assert!(ensure_in_scope(Some(org), org, "Session").is_ok());

        let err = ensure_in_scope(Some(OrganizationId::new()), org, "Session").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
        assert_eq!(err.error.to_string(), "Session not found");
    }
}
