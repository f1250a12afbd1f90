use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use trainhub_core::AppError;
use trainhub_models::{CourseId, LessonId, SessionId};
use uuid::Uuid;

use crate::middleware::auth::{RequireElearningManage, RequireElearningRead};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::auth_helpers::{organization_for_scoped_operation, resource_scope};
use crate::validator::ValidatedJson;

use super::model::{
    CompleteLessonDto, Course, CourseFilterParams, CourseWithLessons, CreateCourseDto,
    CreateLessonDto, CreateQuizAttemptDto, Lesson, LessonProgress, LinkCourseDto, QuizAttempt,
    SessionCourse, SessionProgressReport, TrackProgressDto, UpdateCourseDto,
};
use super::service::ElearningService;

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 409, description = "Slug already used in this organization", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_course(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, dto.organization_id)?;
    let course = ElearningService::create_course(&state.db, organization_id, dto).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseFilterParams),
    responses(
        (status = 200, description = "Courses", body = Vec<Course>)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_courses(
    State(state): State<AppState>,
    RequireElearningRead(auth_user): RequireElearningRead,
    Query(filters): Query<CourseFilterParams>,
) -> Result<Json<Vec<Course>>, AppError> {
    let organization_id = organization_for_scoped_operation(&auth_user, filters.organization_id)?;
    let courses = ElearningService::get_courses(&state.db, organization_id, filters).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with its ordered lessons", body = CourseWithLessons),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    RequireElearningRead(auth_user): RequireElearningRead,
    Path(id): Path<Uuid>,
) -> Result<Json<CourseWithLessons>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let course = ElearningService::get_course(&state.db, CourseId::from_uuid(id), scope).await?;
    Ok(Json(course))
}

#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseDto,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_course(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateCourseDto>,
) -> Result<Json<Course>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let course =
        ElearningService::update_course(&state.db, CourseId::from_uuid(id), scope, dto).await?;
    Ok(Json(course))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    ElearningService::delete_course(&state.db, CourseId::from_uuid(id), scope).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/lessons",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateLessonDto,
    responses(
        (status = 201, description = "Lesson added", body = Lesson),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_lesson(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateLessonDto>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let lesson =
        ElearningService::create_lesson(&state.db, CourseId::from_uuid(id), scope, dto).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}/lessons/{lesson_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("lesson_id" = Uuid, Path, description = "Lesson ID")
    ),
    responses(
        (status = 204, description = "Lesson deleted"),
        (status = 404, description = "Course or lesson not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_lesson(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    Path((id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    ElearningService::delete_lesson(
        &state.db,
        CourseId::from_uuid(id),
        LessonId::from_uuid(lesson_id),
        scope,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/courses",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = LinkCourseDto,
    responses(
        (status = 200, description = "Courses linked to the session", body = Vec<SessionCourse>),
        (status = 404, description = "Session or course not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn link_course(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<LinkCourseDto>,
) -> Result<Json<Vec<SessionCourse>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let courses =
        ElearningService::link_course(&state.db, SessionId::from_uuid(id), scope, dto).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/courses",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Courses linked to the session", body = Vec<SessionCourse>),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_courses(
    State(state): State<AppState>,
    RequireElearningRead(auth_user): RequireElearningRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SessionCourse>>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let courses =
        ElearningService::get_session_courses(&state.db, SessionId::from_uuid(id), scope).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}/courses/{course_id}",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 204, description = "Course unlinked"),
        (status = 404, description = "Session not found or course not linked", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn unlink_course(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    Path((id, course_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let scope = resource_scope(&auth_user)?;
    ElearningService::unlink_course(
        &state.db,
        SessionId::from_uuid(id),
        CourseId::from_uuid(course_id),
        scope,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/elearning/progress",
    request_body = TrackProgressDto,
    responses(
        (status = 200, description = "Progress saved", body = LessonProgress),
        (status = 404, description = "Lesson or student not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn track_progress(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    ValidatedJson(dto): ValidatedJson<TrackProgressDto>,
) -> Result<Json<LessonProgress>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let progress = ElearningService::track_progress(&state.db, scope, dto).await?;
    Ok(Json(progress))
}

#[utoipa::path(
    post,
    path = "/api/elearning/progress/complete",
    request_body = CompleteLessonDto,
    responses(
        (status = 200, description = "Lesson marked as completed", body = LessonProgress),
        (status = 404, description = "Lesson or student not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn complete_lesson(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    ValidatedJson(dto): ValidatedJson<CompleteLessonDto>,
) -> Result<Json<LessonProgress>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let progress = ElearningService::complete_lesson(&state.db, scope, dto).await?;
    Ok(Json(progress))
}

#[utoipa::path(
    post,
    path = "/api/elearning/quiz-attempts",
    request_body = CreateQuizAttemptDto,
    responses(
        (status = 201, description = "Attempt recorded", body = QuizAttempt),
        (status = 404, description = "Course or student not found", body = ErrorResponse),
        (status = 422, description = "Score out of range", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn record_quiz_attempt(
    State(state): State<AppState>,
    RequireElearningManage(auth_user): RequireElearningManage,
    ValidatedJson(dto): ValidatedJson<CreateQuizAttemptDto>,
) -> Result<(StatusCode, Json<QuizAttempt>), AppError> {
    let scope = resource_scope(&auth_user)?;
    let attempt = ElearningService::record_quiz_attempt(&state.db, scope, dto).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/elearning/progress",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Per learner and course progress with aggregates", body = SessionProgressReport),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "E-learning",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session_progress(
    State(state): State<AppState>,
    RequireElearningRead(auth_user): RequireElearningRead,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionProgressReport>, AppError> {
    let scope = resource_scope(&auth_user)?;
    let report =
        ElearningService::get_session_progress(&state.db, SessionId::from_uuid(id), scope).await?;
    Ok(Json(report))
}
