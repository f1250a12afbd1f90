#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{Duration, NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::{PgPool, Postgres, Transaction};
use tower::ServiceExt;
use trainhub::router::init_router;
use trainhub::state::AppState;
use trainhub_config::{EmailConfig, RateLimitConfig};
use trainhub_core::file_storage::LocalFileStorage;
use trainhub_core::hash_password;
use uuid::Uuid;

pub const PASSWORD: &str = "testpass123";

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub organization_id: Option<Uuid>,
}

/// Archive directory shared by every router built over the same test
/// database, so a job written by one request can be downloaded by the next.
pub fn test_storage_dir(pool: &PgPool) -> PathBuf {
    let database = pool
        .connect_options()
        .get_database()
        .map(str::to_string)
        .unwrap_or_else(|| "default".to_string());
    std::env::temp_dir().join(format!("trainhub-test-{database}"))
}

/// Router over `pool` with throttling and SMTP off and archives written to a
/// per-database directory.
pub fn setup_test_app(pool: PgPool) -> Router {
    dotenvy::dotenv().ok();
    let storage_dir = test_storage_dir(&pool);
    let mut state = AppState::from_pool(pool);
    state.rate_limit_config = RateLimitConfig::disabled();
    state.email_config = EmailConfig::disabled();
    state.storage = Arc::new(LocalFileStorage::new(
        storage_dir,
        "http://localhost:3000/files".to_string(),
    ));
    init_router(state)
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub fn days_from_today(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

pub async fn create_test_organization(tx: &mut Transaction<'_, Postgres>, name: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO organizations (name, city, email) VALUES ($1, 'Abidjan', 'contact@org.test') RETURNING id",
    )
    .bind(name)
    .fetch_one(&mut **tx)
    .await
    .unwrap()
}

/// `role` is one of `system_admin`, `admin`, `manager` or `trainer`.
pub async fn create_test_user(
    tx: &mut Transaction<'_, Postgres>,
    role: &str,
    organization_id: Option<Uuid>,
) -> TestUser {
    let email = generate_unique_email();
    let hashed = hash_password(PASSWORD).unwrap();

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (organization_id, first_name, last_name, email, password_hash, role)
        VALUES ($1, 'Test', 'User', $2, $3, $4::user_role)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(&email)
    .bind(hashed)
    .bind(role)
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    TestUser {
        id,
        email,
        organization_id,
    }
}

pub async fn create_test_formation(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    price: f64,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO formations (organization_id, name, price) VALUES ($1, 'Excel avancé', $2) RETURNING id",
    )
    .bind(organization_id)
    .bind(price)
    .fetch_one(&mut **tx)
    .await
    .unwrap()
}

pub async fn create_test_session(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    formation_id: Uuid,
    capacity_max: Option<i32>,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO sessions
            (organization_id, formation_id, name, start_date, end_date, location, capacity_max)
        VALUES ($1, $2, 'Excel avancé - session test', $3, $4, 'Salle B', $5)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(formation_id)
    .bind(days_from_today(14))
    .bind(days_from_today(16))
    .bind(capacity_max)
    .fetch_one(&mut **tx)
    .await
    .unwrap()
}

pub async fn create_test_slot(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    date: NaiveDate,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO session_slots (session_id, date, time_slot, start_time, end_time)
        VALUES ($1, $2, 'morning', '09:00', '12:00')
        RETURNING id
        "#,
    )
    .bind(session_id)
    .bind(date)
    .fetch_one(&mut **tx)
    .await
    .unwrap()
}

pub async fn create_test_student(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO students (organization_id, first_name, last_name, email)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .fetch_one(&mut **tx)
    .await
    .unwrap()
}

pub async fn create_test_enrollment(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    session_id: Uuid,
    student_id: Uuid,
    total_amount: f64,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO enrollments (organization_id, session_id, student_id, total_amount)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(session_id)
    .bind(student_id)
    .bind(total_amount)
    .fetch_one(&mut **tx)
    .await
    .unwrap()
}

pub async fn get_auth_token(app: Router, email: &str) -> String {
    let response = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    let body = body_json(response).await;
    body["access_token"].as_str().unwrap().to_string()
}

pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
