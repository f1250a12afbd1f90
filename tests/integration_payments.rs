mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::{
    body_json, create_test_enrollment, create_test_formation, create_test_organization,
    create_test_session, create_test_student, create_test_user, get_auth_token, send,
    setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

struct Fixture {
    token: String,
    session: Uuid,
    enrollments: Vec<Uuid>,
}

async fn setup(pool: &PgPool, learners: usize) -> Fixture {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 100_000.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;

    let mut enrollments = Vec::new();
    for i in 0..learners {
        let student =
            create_test_student(&mut tx, org, "Learner", &format!("Number {i}"), None).await;
        enrollments
            .push(create_test_enrollment(&mut tx, org, session, student, 100_000.0).await);
    }
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;
    Fixture {
        token,
        session,
        enrollments,
    }
}

async fn enrollment_json(pool: &PgPool, token: &str, enrollment: Uuid) -> serde_json::Value {
    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/enrollments/{enrollment}"),
        Some(token),
        None,
    )
    .await;
    body_json(response).await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_payments_update_paid_amount_and_status(pool: PgPool) {
    let fx = setup(&pool, 1).await;
    let enrollment = fx.enrollments[0];
    let uri = format!("/api/enrollments/{enrollment}/payments");

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &uri,
        Some(&fx.token),
        Some(json!({ "amount": 40000.0, "method": "mobile_money", "provider": "orange" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = enrollment_json(&pool, &fx.token, enrollment).await;
    assert_eq!(body["paid_amount"], 40000.0);
    assert_eq!(body["payment_status"], "partial");

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &uri,
        Some(&fx.token),
        Some(json!({ "amount": 60000.0, "method": "cash" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = enrollment_json(&pool, &fx.token, enrollment).await;
    assert_eq!(body["paid_amount"], 100000.0);
    assert_eq!(body["payment_status"], "paid");

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{}/payments", fx.session),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_overpayment_is_rejected(pool: PgPool) {
    let fx = setup(&pool, 1).await;
    let enrollment = fx.enrollments[0];

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{enrollment}/payments"),
        Some(&fx.token),
        Some(json!({ "amount": 100001.0, "method": "card" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Payment exceeds the remaining amount (100000.00)"
    );

    let body = enrollment_json(&pool, &fx.token, enrollment).await;
    assert_eq!(body["paid_amount"], 0.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_a_payment_restores_the_balance(pool: PgPool) {
    let fx = setup(&pool, 1).await;
    let enrollment = fx.enrollments[0];

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{enrollment}/payments"),
        Some(&fx.token),
        Some(json!({ "amount": 25000.0, "method": "bank_transfer", "reference": "VIR-001" })),
    )
    .await;
    let payment = body_json(response).await;
    let payment_id = payment["id"].as_str().unwrap().to_string();

    // managers may record payments but not delete them
    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/payments/{payment_id}"),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut tx = pool.begin().await.unwrap();
    let org = sqlx::query_scalar::<_, Uuid>("SELECT organization_id FROM enrollments WHERE id = $1")
        .bind(enrollment)
        .fetch_one(&mut *tx)
        .await
        .unwrap();
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    tx.commit().await.unwrap();
    let admin_token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/payments/{payment_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = enrollment_json(&pool, &fx.token, enrollment).await;
    assert_eq!(body["paid_amount"], 0.0);
    assert_eq!(body["payment_status"], "pending");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invoice_numbers_are_sequential(pool: PgPool) {
    let fx = setup(&pool, 2).await;
    let year = Utc::now().year();

    let mut numbers = Vec::new();
    for enrollment in &fx.enrollments {
        let response = send(
            setup_test_app(pool.clone()),
            "POST",
            &format!("/api/enrollments/{enrollment}/invoice"),
            Some(&fx.token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["amount"], 100000.0);
        numbers.push(body["number"].as_str().unwrap().to_string());
    }

    assert_eq!(
        numbers,
        vec![format!("FAC-{year}-00001"), format!("FAC-{year}-00002")]
    );

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{}/invoice", fx.enrollments[0]),
        Some(&fx.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "This enrollment has already been invoiced");
}
