mod common;

use std::io::Cursor;
use std::time::Duration;

use axum::http::{StatusCode, header};
use common::{
    body_bytes, body_json, create_test_enrollment, create_test_formation,
    create_test_organization, create_test_session, create_test_student, create_test_user,
    get_auth_token, send, setup_test_app,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use trainhub::modules::documents::jobs::DocumentJobService;
use uuid::Uuid;

struct Fixture {
    token: String,
    session: Uuid,
    with_email: Uuid,
    without_email: Uuid,
}

async fn setup(pool: &PgPool) -> Fixture {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 100_000.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let awa = create_test_student(&mut tx, org, "Awa", "Koné", Some("awa.kone@example.com")).await;
    let yao = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    let with_email = create_test_enrollment(&mut tx, org, session, awa, 100_000.0).await;
    let without_email = create_test_enrollment(&mut tx, org, session, yao, 100_000.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;
    Fixture {
        token,
        session,
        with_email,
        without_email,
    }
}

/// Polls a job until it leaves `pending`/`running`.
async fn wait_for_job(pool: &PgPool, token: &str, job_id: &str) -> Value {
    for _ in 0..100 {
        let response = send(
            setup_test_app(pool.clone()),
            "GET",
            &format!("/api/document-jobs/{job_id}"),
            Some(token),
            None,
        )
        .await;
        let job = body_json(response).await;
        if job["status"] == "completed" || job["status"] == "failed" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {job_id} did not finish");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_convocation_pdf(pool: PgPool) {
    let fx = setup(&pool).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/enrollments/{}/documents/convocation", fx.with_email),
        Some(&fx.token),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("convocation_"));

    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF-"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_convention_as_html(pool: PgPool) {
    let fx = setup(&pool).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{}/documents/convention?format=html", fx.session),
        Some(&fx.token),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Centre Formation Plus"));
    assert!(html.contains("Excel avancé"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_document_kind_must_match_the_route(pool: PgPool) {
    let fx = setup(&pool).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{}/documents/brochure", fx.session),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Unknown document kind: brochure"
    );

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{}/documents/contract", fx.session),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_send_convocation_requires_an_email(pool: PgPool) {
    let fx = setup(&pool).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{}/send-convocation", fx.without_email),
        Some(&fx.token),
        Some(json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "The student has no email address"
    );

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{}/send-convocation", fx.with_email),
        Some(&fx.token),
        Some(json!({ "language": "en" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["recipient"],
        "awa.kone@example.com"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bulk_contracts_archive(pool: PgPool) {
    let fx = setup(&pool).await;
    let app = setup_test_app(pool.clone());

    let response = send(
        app.clone(),
        "POST",
        &format!("/api/sessions/{}/documents/bulk", fx.session),
        Some(&fx.token),
        Some(json!({ "kind": "conventions_contracts" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job = body_json(response).await;
    assert_eq!(job["total"], 3);
    let job_id = job["id"].as_str().unwrap().to_string();

    let job = wait_for_job(&pool, &fx.token, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["current"], 3);
    assert_eq!(job["percentage"], 100);
    assert_eq!(job["checksum"].as_str().unwrap().len(), 64);

    let response = send(
        app,
        "GET",
        &format!("/api/document-jobs/{job_id}/download"),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 3);
    assert_eq!(archive.by_index(0).unwrap().name(), "convention_generale.pdf");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_convocation_emails_job_counts_reachable_learners(pool: PgPool) {
    let fx = setup(&pool).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/sessions/{}/send-convocations", fx.session),
        Some(&fx.token),
        Some(json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job = body_json(response).await;
    assert_eq!(job["kind"], "convocation_emails");
    assert_eq!(job["total"], 1);
    let job_id = job["id"].as_str().unwrap().to_string();

    let job = wait_for_job(&pool, &fx.token, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["success_count"], 1);
    assert_eq!(job["error_count"], 0);

    // an email job has no archive to download
    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/document-jobs/{job_id}/download"),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_interrupted_jobs_are_failed_on_startup(pool: PgPool) {
    let fx = setup(&pool).await;

    let insert_job = |status: &'static str| {
        let pool = pool.clone();
        let session = fx.session;
        async move {
            sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO document_jobs (organization_id, session_id, kind, status, total)
                SELECT organization_id, id, 'convocations', $2::document_job_status, 2
                FROM sessions WHERE id = $1
                RETURNING id
                "#,
            )
            .bind(session)
            .bind(status)
            .fetch_one(&pool)
            .await
            .unwrap()
        }
    };
    let running = insert_job("running").await;
    let pending = insert_job("pending").await;
    let completed = insert_job("completed").await;

    let interrupted = DocumentJobService::fail_interrupted_jobs(&pool).await.unwrap();
    assert_eq!(interrupted, 2);

    for (job_id, expected) in [
        (running, "failed"),
        (pending, "failed"),
        (completed, "completed"),
    ] {
        let response = send(
            setup_test_app(pool.clone()),
            "GET",
            &format!("/api/document-jobs/{job_id}"),
            Some(&fx.token),
            None,
        )
        .await;
        let job = body_json(response).await;
        assert_eq!(job["status"], expected);
    }
}
