//! Permission names and role grants.
//!
//! Permissions are embedded in access tokens at login, so authorization checks
//! never hit the database. Each role maps to a fixed permission set returned
//! by [`permissions_for_role`].
//!
//! ```ignore
//! use trainhub_core::permissions;
//!
//! if auth_user.has_permission(permissions::ENROLLMENTS_CREATE) {
//!     // enroll the student
//! }
//! ```

// Organizations
pub const ORGANIZATIONS_CREATE: &str = "organizations:create";
pub const ORGANIZATIONS_READ: &str = "organizations:read";
pub const ORGANIZATIONS_UPDATE: &str = "organizations:update";
pub const ORGANIZATIONS_DELETE: &str = "organizations:delete";

// Staff users
pub const USERS_CREATE: &str = "users:create";
pub const USERS_READ: &str = "users:read";
pub const USERS_UPDATE: &str = "users:update";
pub const USERS_DELETE: &str = "users:delete";

// Learners
pub const STUDENTS_CREATE: &str = "students:create";
pub const STUDENTS_READ: &str = "students:read";
pub const STUDENTS_UPDATE: &str = "students:update";
pub const STUDENTS_DELETE: &str = "students:delete";

// Catalog
pub const FORMATIONS_CREATE: &str = "formations:create";
pub const FORMATIONS_READ: &str = "formations:read";
pub const FORMATIONS_UPDATE: &str = "formations:update";
pub const FORMATIONS_DELETE: &str = "formations:delete";
pub const PROGRAMS_CREATE: &str = "programs:create";
pub const PROGRAMS_READ: &str = "programs:read";
pub const PROGRAMS_UPDATE: &str = "programs:update";
pub const PROGRAMS_DELETE: &str = "programs:delete";

// Sessions and their slots
pub const SESSIONS_CREATE: &str = "sessions:create";
pub const SESSIONS_READ: &str = "sessions:read";
pub const SESSIONS_UPDATE: &str = "sessions:update";
pub const SESSIONS_DELETE: &str = "sessions:delete";
pub const SLOTS_MANAGE: &str = "slots:manage";
pub const SLOTS_READ: &str = "slots:read";

// Enrollments
pub const ENROLLMENTS_CREATE: &str = "enrollments:create";
pub const ENROLLMENTS_READ: &str = "enrollments:read";
pub const ENROLLMENTS_UPDATE: &str = "enrollments:update";
pub const ENROLLMENTS_DELETE: &str = "enrollments:delete";

// Documents
pub const DOCUMENTS_GENERATE: &str = "documents:generate";
pub const DOCUMENTS_SEND: &str = "documents:send";
pub const SIGNATURES_SEND: &str = "signatures:send";
pub const SIGNATURES_READ: &str = "signatures:read";

// Learning follow-up
pub const ELEARNING_MANAGE: &str = "elearning:manage";
pub const ELEARNING_READ: &str = "elearning:read";
pub const ATTENDANCE_RECORD: &str = "attendance:record";
pub const ATTENDANCE_READ: &str = "attendance:read";
pub const GRADES_MANAGE: &str = "grades:manage";
pub const GRADES_READ: &str = "grades:read";

// Finances
pub const PAYMENTS_CREATE: &str = "payments:create";
pub const PAYMENTS_READ: &str = "payments:read";
pub const PAYMENTS_DELETE: &str = "payments:delete";
pub const INVOICES_CREATE: &str = "invoices:create";

// Reporting
pub const REPORTS_VIEW: &str = "reports:view";
pub const REPORTS_EXPORT: &str = "reports:export";

/// Role names as stored in `users.role`.
pub mod roles {
    pub const SYSTEM_ADMIN: &str = "system_admin";
    pub const ADMIN: &str = "admin";
    pub const MANAGER: &str = "manager";
    pub const TRAINER: &str = "trainer";
}

const ALL: &[&str] = &[
    ORGANIZATIONS_CREATE,
    ORGANIZATIONS_READ,
    ORGANIZATIONS_UPDATE,
    ORGANIZATIONS_DELETE,
    USERS_CREATE,
    USERS_READ,
    USERS_UPDATE,
    USERS_DELETE,
    STUDENTS_CREATE,
    STUDENTS_READ,
    STUDENTS_UPDATE,
    STUDENTS_DELETE,
    FORMATIONS_CREATE,
    FORMATIONS_READ,
    FORMATIONS_UPDATE,
    FORMATIONS_DELETE,
    PROGRAMS_CREATE,
    PROGRAMS_READ,
    PROGRAMS_UPDATE,
    PROGRAMS_DELETE,
    SESSIONS_CREATE,
    SESSIONS_READ,
    SESSIONS_UPDATE,
    SESSIONS_DELETE,
    SLOTS_MANAGE,
    SLOTS_READ,
    ENROLLMENTS_CREATE,
    ENROLLMENTS_READ,
    ENROLLMENTS_UPDATE,
    ENROLLMENTS_DELETE,
    DOCUMENTS_GENERATE,
    DOCUMENTS_SEND,
    SIGNATURES_SEND,
    SIGNATURES_READ,
    ELEARNING_MANAGE,
    ELEARNING_READ,
    ATTENDANCE_RECORD,
    ATTENDANCE_READ,
    GRADES_MANAGE,
    GRADES_READ,
    PAYMENTS_CREATE,
    PAYMENTS_READ,
    PAYMENTS_DELETE,
    INVOICES_CREATE,
    REPORTS_VIEW,
    REPORTS_EXPORT,
];

const MANAGER: &[&str] = &[
    ORGANIZATIONS_READ,
    USERS_READ,
    STUDENTS_CREATE,
    STUDENTS_READ,
    STUDENTS_UPDATE,
    STUDENTS_DELETE,
    FORMATIONS_READ,
    PROGRAMS_READ,
    SESSIONS_CREATE,
    SESSIONS_READ,
    SESSIONS_UPDATE,
    SESSIONS_DELETE,
    SLOTS_MANAGE,
    SLOTS_READ,
    ENROLLMENTS_CREATE,
    ENROLLMENTS_READ,
    ENROLLMENTS_UPDATE,
    ENROLLMENTS_DELETE,
    DOCUMENTS_GENERATE,
    DOCUMENTS_SEND,
    SIGNATURES_SEND,
    SIGNATURES_READ,
    ELEARNING_MANAGE,
    ELEARNING_READ,
    ATTENDANCE_RECORD,
    ATTENDANCE_READ,
    GRADES_MANAGE,
    GRADES_READ,
    PAYMENTS_CREATE,
    PAYMENTS_READ,
    INVOICES_CREATE,
    REPORTS_VIEW,
    REPORTS_EXPORT,
];

const TRAINER: &[&str] = &[
    ORGANIZATIONS_READ,
    STUDENTS_READ,
    FORMATIONS_READ,
    PROGRAMS_READ,
    SESSIONS_READ,
    SLOTS_READ,
    ENROLLMENTS_READ,
    SIGNATURES_READ,
    ELEARNING_READ,
    ATTENDANCE_RECORD,
    ATTENDANCE_READ,
    GRADES_MANAGE,
    GRADES_READ,
    REPORTS_VIEW,
];

/// Returns the permissions granted to `role`. Unknown roles get nothing.
pub fn permissions_for_role(role: &str) -> Vec<String> {
    let granted: Vec<&str> = match role {
        roles::SYSTEM_ADMIN => ALL.to_vec(),
        roles::ADMIN => ALL
            .iter()
            .copied()
            .filter(|p| *p != ORGANIZATIONS_CREATE && *p != ORGANIZATIONS_DELETE)
            .collect(),
        roles::MANAGER => MANAGER.to_vec(),
        roles::TRAINER => TRAINER.to_vec(),
        _ => Vec::new(),
    };

    granted.into_iter().map(str::to_string).collect()
}
