use trainhub_core::PaginationMeta;
use trainhub_models::attendance::AttendanceStatus;
use trainhub_models::documents::{DocumentJobStatus, DocumentKind, Language};
use trainhub_models::elearning::ProgressStatus;
use trainhub_models::enrollments::{EnrollmentStatus, PaymentStatus};
use trainhub_models::grades::AssessmentType;
use trainhub_models::payments::PaymentMethod;
use trainhub_models::sessions::SessionStatus;
use trainhub_models::signatures::{RecipientType, SignatureDocument, SignatureStatus};
use trainhub_models::slots::TimeSlot;
use trainhub_models::users::UserRole;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh_token,
        crate::modules::auth::controller::get_me,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::deactivate_user,
        crate::modules::organizations::controller::create_organization,
        crate::modules::organizations::controller::get_organizations,
        crate::modules::organizations::controller::get_organization,
        crate::modules::organizations::controller::update_organization,
        crate::modules::organizations::controller::delete_organization,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::formations::controller::create_formation,
        crate::modules::formations::controller::get_formations,
        crate::modules::formations::controller::get_formation,
        crate::modules::formations::controller::update_formation,
        crate::modules::formations::controller::delete_formation,
        crate::modules::programs::controller::create_program,
        crate::modules::programs::controller::get_programs,
        crate::modules::programs::controller::get_program,
        crate::modules::programs::controller::update_program,
        crate::modules::programs::controller::delete_program,
        crate::modules::sessions::controller::create_session,
        crate::modules::sessions::controller::get_sessions,
        crate::modules::sessions::controller::get_session,
        crate::modules::sessions::controller::update_session,
        crate::modules::sessions::controller::update_session_status,
        crate::modules::sessions::controller::set_session_programs,
        crate::modules::sessions::controller::delete_session,
        crate::modules::slots::controller::get_session_slots,
        crate::modules::slots::controller::generate_slots,
        crate::modules::slots::controller::create_slot,
        crate::modules::slots::controller::delete_session_slots,
        crate::modules::slots::controller::update_slot,
        crate::modules::slots::controller::delete_slot,
        crate::modules::enrollments::controller::create_enrollment,
        crate::modules::enrollments::controller::bulk_enroll,
        crate::modules::enrollments::controller::get_session_enrollments,
        crate::modules::enrollments::controller::get_session_capacity,
        crate::modules::enrollments::controller::get_enrollment,
        crate::modules::enrollments::controller::update_enrollment,
        crate::modules::enrollments::controller::cancel_enrollment,
        crate::modules::enrollments::controller::delete_enrollment,
        crate::modules::attendance::controller::record_attendance,
        crate::modules::attendance::controller::get_slot_attendance,
        crate::modules::attendance::controller::get_session_attendance,
        crate::modules::attendance::controller::get_attendance_stats,
        crate::modules::grades::controller::create_grade,
        crate::modules::grades::controller::get_session_grades,
        crate::modules::grades::controller::get_grade_stats,
        crate::modules::grades::controller::update_grade,
        crate::modules::grades::controller::delete_grade,
        crate::modules::payments::controller::record_payment,
        crate::modules::payments::controller::get_enrollment_payments,
        crate::modules::payments::controller::get_session_payments,
        crate::modules::payments::controller::delete_payment,
        crate::modules::payments::controller::create_invoice,
        crate::modules::elearning::controller::create_course,
        crate::modules::elearning::controller::get_courses,
        crate::modules::elearning::controller::get_course,
        crate::modules::elearning::controller::update_course,
        crate::modules::elearning::controller::delete_course,
        crate::modules::elearning::controller::create_lesson,
        crate::modules::elearning::controller::delete_lesson,
        crate::modules::elearning::controller::link_course,
        crate::modules::elearning::controller::get_session_courses,
        crate::modules::elearning::controller::unlink_course,
        crate::modules::elearning::controller::track_progress,
        crate::modules::elearning::controller::complete_lesson,
        crate::modules::elearning::controller::record_quiz_attempt,
        crate::modules::elearning::controller::get_session_progress,
        crate::modules::reports::controller::get_session_report,
        crate::modules::reports::controller::export_session_report,
        crate::modules::reports::controller::get_dashboard,
        crate::modules::documents::controller::get_session_document,
        crate::modules::documents::controller::get_enrollment_document,
        crate::modules::documents::controller::create_bulk_job,
        crate::modules::documents::controller::send_session_convocations,
        crate::modules::documents::controller::get_session_jobs,
        crate::modules::documents::controller::get_job,
        crate::modules::documents::controller::download_job_archive,
        crate::modules::documents::controller::send_convocation,
        crate::modules::documents::controller::send_contract,
        crate::modules::signatures::controller::create_request,
        crate::modules::signatures::controller::get_enrollment_requests,
        crate::modules::signatures::controller::create_bulk_requests,
        crate::modules::signatures::controller::list_requests,
        crate::modules::signatures::controller::get_request,
        crate::modules::signatures::controller::cancel_request,
        crate::modules::signatures::controller::send_reminder,
        crate::modules::signatures::controller::get_public_request,
        crate::modules::signatures::controller::download_document,
        crate::modules::signatures::controller::sign_document,
        crate::modules::signatures::controller::decline_document,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            UserRole,
            SessionStatus,
            TimeSlot,
            EnrollmentStatus,
            PaymentStatus,
            PaymentMethod,
            AttendanceStatus,
            AssessmentType,
            ProgressStatus,
            DocumentKind,
            DocumentJobStatus,
            Language,
            SignatureStatus,
            SignatureDocument,
            RecipientType,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and token refresh"),
        (name = "Users", description = "Staff accounts and trainers"),
        (name = "Organizations", description = "Training organizations"),
        (name = "Students", description = "Learner records"),
        (name = "Formations", description = "Training catalog"),
        (name = "Programs", description = "Program content attached to sessions"),
        (name = "Sessions", description = "Scheduled runs of a formation"),
        (name = "Slots", description = "Half-day session slots"),
        (name = "Enrollments", description = "Learners enrolled in sessions"),
        (name = "Attendance", description = "Attendance marks per slot"),
        (name = "Grades", description = "Assessment results"),
        (name = "Payments", description = "Payments and invoices"),
        (name = "E-learning", description = "Courses, lessons and learner progress"),
        (name = "Reports", description = "Session reports and dashboard"),
        (name = "Documents", description = "Generated PDFs, archives and emails"),
        (name = "Signatures", description = "Signature requests and public signing links")
    ),
    info(
        title = "TrainHub API",
        version = "0.1.0",
        description = "Back office for training organizations: sessions, enrollments, documents and follow-up.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
