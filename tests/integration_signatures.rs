mod common;

use axum::http::{StatusCode, header};
use common::{
    body_bytes, body_json, create_test_enrollment, create_test_formation,
    create_test_organization, create_test_session, create_test_student, create_test_user,
    get_auth_token, send, setup_test_app,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

struct Fixture {
    token: String,
    trainer_token: String,
    session: Uuid,
    with_email: Uuid,
    without_email: Uuid,
}

async fn setup(pool: &PgPool) -> Fixture {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let trainer = create_test_user(&mut tx, "trainer", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 100_000.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let awa = create_test_student(&mut tx, org, "Awa", "Koné", Some("awa.kone@example.com")).await;
    let yao = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    let with_email = create_test_enrollment(&mut tx, org, session, awa, 100_000.0).await;
    let without_email = create_test_enrollment(&mut tx, org, session, yao, 100_000.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;
    let trainer_token = get_auth_token(setup_test_app(pool.clone()), &trainer.email).await;
    Fixture {
        token,
        trainer_token,
        session,
        with_email,
        without_email,
    }
}

async fn request_signature(pool: &PgPool, token: &str, enrollment: Uuid, body: Value) -> Value {
    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{enrollment}/signature-requests"),
        Some(token),
        Some(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn link_token(pool: &PgPool, request: &Value) -> String {
    let id: Uuid = request["id"].as_str().unwrap().parse().unwrap();
    sqlx::query_scalar::<_, String>("SELECT token FROM signature_requests WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_contract_request_defaults_to_learner(pool: PgPool) {
    let fx = setup(&pool).await;

    let request =
        request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;

    assert_eq!(request["status"], "pending");
    assert_eq!(request["recipient_type"], "student");
    assert_eq!(request["recipient_name"], "Awa Koné");
    assert_eq!(request["recipient_email"], "awa.kone@example.com");
    assert_eq!(request["language"], "fr");
    assert_eq!(request["session_id"], fx.session.to_string());
    assert!(
        request["subject"]
            .as_str()
            .unwrap()
            .starts_with("Demande de signature : Contrat de formation")
    );
    assert!(request.get("token").is_none());

    let token = link_token(&pool, &request).await;
    assert_eq!(token.len(), 64);

    // listed for the enrollment and readable by trainers
    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/enrollments/{}/signature-requests", fx.with_email),
        Some(&fx.trainer_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_one_pending_request_per_document(pool: PgPool) {
    let fx = setup(&pool).await;

    let first =
        request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{}/signature-requests", fx.with_email),
        Some(&fx.token),
        Some(json!({ "document": "contract" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"],
        "A pending signature request already exists for this document"
    );

    // another document is independent
    request_signature(
        &pool,
        &fx.token,
        fx.with_email,
        json!({
            "document": "convention",
            "recipient_type": "funder",
            "recipient_name": "Orange CI",
            "recipient_email": "rh@orange.example.com"
        }),
    )
    .await;

    // once cancelled, the contract can be requested again
    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signature-requests/{}/cancel", first["id"].as_str().unwrap()),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = body_json(response).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["cancelled_at"].is_string());

    request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;
}

#[sqlx::test(migrations = "./migrations")]
async fn test_request_needs_recipient_address(pool: PgPool) {
    let fx = setup(&pool).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{}/signature-requests", fx.without_email),
        Some(&fx.token),
        Some(json!({ "document": "contract" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "The recipient has no email address"
    );

    // an explicit address is enough
    let request = request_signature(
        &pool,
        &fx.token,
        fx.without_email,
        json!({ "document": "contract", "recipient_email": "yao.kouassi@example.com" }),
    )
    .await;
    assert_eq!(request["recipient_name"], "Yao Kouassi");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancelled_enrollment_cannot_be_sent_for_signature(pool: PgPool) {
    let fx = setup(&pool).await;
    sqlx::query("UPDATE enrollments SET status = 'cancelled' WHERE id = $1")
        .bind(fx.with_email)
        .execute(&pool)
        .await
        .unwrap();

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{}/signature-requests", fx.with_email),
        Some(&fx.token),
        Some(json!({ "document": "contract" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_trainer_cannot_send_signature_requests(pool: PgPool) {
    let fx = setup(&pool).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{}/signature-requests", fx.with_email),
        Some(&fx.trainer_token),
        Some(json!({ "document": "contract" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bulk_requests_skip_learners_without_email(pool: PgPool) {
    let fx = setup(&pool).await;
    // already pending for Awa's convention
    request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "convention" })).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/sessions/{}/signature-requests/bulk", fx.session),
        Some(&fx.token),
        Some(json!({ "document": "contract", "language": "en" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["created"].as_array().unwrap().len(), 1);
    assert_eq!(body["created"][0]["enrollment_id"], fx.with_email.to_string());
    assert_eq!(body["created"][0]["language"], "en");
    assert_eq!(body["skipped"][0]["enrollment_id"], fx.without_email.to_string());
    assert_eq!(body["skipped"][0]["reason"], "The student has no email address");

    // a second run finds the contract already pending
    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/sessions/{}/signature-requests/bulk", fx.session),
        Some(&fx.token),
        Some(json!({ "document": "contract" })),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["created"].as_array().unwrap().len(), 0);
    let reasons: Vec<&str> = body["skipped"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["reason"].as_str().unwrap())
        .collect();
    assert_eq!(reasons.len(), 2);
    assert!(reasons.contains(&"A pending signature request already exists for this document"));

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/signature-requests?session_id={}&status=pending", fx.session),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_recipient_signs_through_link(pool: PgPool) {
    let fx = setup(&pool).await;
    let request =
        request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;
    let token = link_token(&pool, &request).await;

    // no bearer token on the public routes
    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/signatures/{token}"),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let public = body_json(response).await;
    assert_eq!(public["status"], "pending");
    assert_eq!(public["organization_name"], "Centre Formation Plus");
    assert_eq!(public["document"], "contract");
    assert!(public.get("recipient_email").is_none());

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/signatures/{token}/document"),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "application/pdf"
    );
    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signatures/{token}/sign"),
        None,
        Some(json!({ "signer_name": "Awa Koné" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let signed = body_json(response).await;
    assert_eq!(signed["status"], "signed");
    assert!(signed["signed_at"].is_string());

    // answered once only
    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signatures/{token}/decline"),
        None,
        Some(json!({ "reason": "Erreur" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/signature-requests/{}", request["id"].as_str().unwrap()),
        Some(&fx.token),
        None,
    )
    .await;
    let stored = body_json(response).await;
    assert_eq!(stored["status"], "signed");
    assert_eq!(stored["signer_name"], "Awa Koné");

    // a signed request cannot be reminded or cancelled
    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signature-requests/{}/remind", request["id"].as_str().unwrap()),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signature-requests/{}/cancel", request["id"].as_str().unwrap()),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_recipient_declines_with_reason(pool: PgPool) {
    let fx = setup(&pool).await;
    let request =
        request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "convention" }))
            .await;
    let token = link_token(&pool, &request).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signatures/{token}/decline"),
        None,
        Some(json!({ "reason": "Dates incompatibles" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "declined");

    let reason = sqlx::query_scalar::<_, Option<String>>(
        "SELECT decline_reason FROM signature_requests WHERE token = $1",
    )
    .bind(&token)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(reason.as_deref(), Some("Dates incompatibles"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reminders_are_counted(pool: PgPool) {
    let fx = setup(&pool).await;
    let request =
        request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;
    let id = request["id"].as_str().unwrap();

    for expected in 1..=2 {
        let response = send(
            setup_test_app(pool.clone()),
            "POST",
            &format!("/api/signature-requests/{id}/remind"),
            Some(&fx.token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let reminded = body_json(response).await;
        assert_eq!(reminded["reminder_count"], expected);
        assert!(reminded["last_reminder_at"].is_string());
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_expired_link_is_refused(pool: PgPool) {
    let fx = setup(&pool).await;
    let request =
        request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;
    let token = link_token(&pool, &request).await;
    sqlx::query(
        "UPDATE signature_requests SET expires_at = NOW() - interval '1 day' WHERE token = $1",
    )
    .bind(&token)
    .execute(&pool)
    .await
    .unwrap();

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signatures/{token}/sign"),
        None,
        Some(json!({ "signer_name": "Awa Koné" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Signature request has expired");

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signature-requests/{}/remind", request["id"].as_str().unwrap()),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let status = sqlx::query_scalar::<_, String>(
        "SELECT status::text FROM signature_requests WHERE token = $1",
    )
    .bind(&token)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "expired");

    // an expired request no longer blocks a new one
    request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unknown_or_cancelled_link(pool: PgPool) {
    let fx = setup(&pool).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/signatures/{}", "0".repeat(64)),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request =
        request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;
    let token = link_token(&pool, &request).await;
    send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/signature-requests/{}/cancel", request["id"].as_str().unwrap()),
        Some(&fx.token),
        None,
    )
    .await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/signatures/{token}"),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Signature request has been cancelled"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_requests_of_another_organization_are_hidden(pool: PgPool) {
    let fx = setup(&pool).await;
    let request =
        request_signature(&pool, &fx.token, fx.with_email, json!({ "document": "contract" })).await;

    let mut tx = pool.begin().await.unwrap();
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let outsider = create_test_user(&mut tx, "manager", Some(other_org)).await;
    tx.commit().await.unwrap();
    let token = get_auth_token(setup_test_app(pool.clone()), &outsider.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/signature-requests/{}", request["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        "/api/signature-requests",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
}
