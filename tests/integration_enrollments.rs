mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_test_enrollment, create_test_formation, create_test_organization,
    create_test_session, create_test_student, create_test_user, days_from_today, get_auth_token,
    send, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_defaults_amount_to_formation_price(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 150_000.0).await;
    let session = create_test_session(&mut tx, org, formation, Some(10)).await;
    let student = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/enrollments",
        Some(&token),
        Some(json!({ "session_id": session, "student_id": student })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["payment_status"], "pending");
    assert_eq!(body["total_amount"], 150_000.0);
    assert_eq!(body["paid_amount"], 0.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_enrollment_is_conflict(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let student = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    create_test_enrollment(&mut tx, org, session, student, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/enrollments",
        Some(&token),
        Some(json!({ "session_id": session, "student_id": student })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "This student is already enrolled in this session"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_full_session_rejects_enrollment(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, Some(1)).await;
    let first = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let second = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    create_test_enrollment(&mut tx, org, session, first, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/enrollments",
        Some(&token),
        Some(json!({ "session_id": session, "student_id": second })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Session is full (1 learners maximum)");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancelling_frees_a_seat(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, Some(1)).await;
    let first = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let enrollment = create_test_enrollment(&mut tx, org, session, first, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{session}/capacity"),
        Some(&token),
        None,
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["is_full"], true);
    assert_eq!(body["available_spots"], 0);

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{enrollment}/cancel"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "cancelled");

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{session}/capacity"),
        Some(&token),
        None,
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["is_full"], false);
    assert_eq!(body["active_enrollments"], 0);
    assert_eq!(body["available_spots"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bulk_enroll_reports_rejections(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, Some(2)).await;
    let a = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let b = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    let c = create_test_student(&mut tx, org, "Fatou", "Diallo", None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/sessions/{session}/enrollments/bulk"),
        Some(&token),
        Some(json!({ "student_ids": [a, b, c] })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["enrolled"].as_array().unwrap().len(), 2);
    let rejected = body["rejected"].as_array().unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["student_id"], c.to_string());
    assert_eq!(rejected[0]["reason"], "Session is full (2 learners maximum)");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_enroll_student_of_another_organization(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let outsider = create_test_student(&mut tx, other_org, "Yao", "Kouassi", None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/enrollments",
        Some(&token),
        Some(json!({ "session_id": session, "student_id": outsider })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_enroll_in_completed_or_cancelled_session(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let completed = create_test_session(&mut tx, org, formation, None).await;
    let cancelled = create_test_session(&mut tx, org, formation, None).await;
    let student = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    sqlx::query("UPDATE sessions SET status = 'completed' WHERE id = $1")
        .bind(completed)
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query("UPDATE sessions SET status = 'cancelled' WHERE id = $1")
        .bind(cancelled)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    for session in [completed, cancelled] {
        let response = send(
            setup_test_app(pool.clone()),
            "POST",
            "/api/enrollments",
            Some(&token),
            Some(json!({ "session_id": session, "student_id": student })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Cannot enroll in a completed or cancelled session"
        );
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invoiced_enrollment_cannot_be_cancelled(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 100_000.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let student = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let enrollment = create_test_enrollment(&mut tx, org, session, student, 100_000.0).await;
    sqlx::query(
        r#"
        INSERT INTO invoices (organization_id, enrollment_id, number, year, sequence, amount)
        VALUES ($1, $2, 'FAC-2025-0001', 2025, 1, 100000)
        "#,
    )
    .bind(org)
    .bind(enrollment)
    .execute(&mut *tx)
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/enrollments/{enrollment}/cancel"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Cannot cancel an enrollment that has been invoiced"
    );

    // a plain update to `cancelled` goes through the same guard
    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &format!("/api/enrollments/{enrollment}"),
        Some(&token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Cannot cancel an enrollment that has been invoiced"
    );

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/enrollments/{enrollment}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body_json(response).await["status"], "confirmed");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_of_completed_session_cannot_be_cancelled(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let completed = create_test_session(&mut tx, org, formation, None).await;
    let ended = create_test_session(&mut tx, org, formation, None).await;
    let student = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let in_completed = create_test_enrollment(&mut tx, org, completed, student, 0.0).await;
    let in_ended = create_test_enrollment(&mut tx, org, ended, student, 0.0).await;
    sqlx::query("UPDATE sessions SET status = 'completed' WHERE id = $1")
        .bind(completed)
        .execute(&mut *tx)
        .await
        .unwrap();
    // still marked ongoing, but its last day is behind us
    sqlx::query(
        "UPDATE sessions SET status = 'ongoing', start_date = $2, end_date = $3 WHERE id = $1",
    )
    .bind(ended)
    .bind(days_from_today(-10))
    .bind(days_from_today(-1))
    .execute(&mut *tx)
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    for enrollment in [in_completed, in_ended] {
        let response = send(
            setup_test_app(pool.clone()),
            "POST",
            &format!("/api/enrollments/{enrollment}/cancel"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Cannot cancel an enrollment of a completed session"
        );

        let response = send(
            setup_test_app(pool.clone()),
            "PUT",
            &format!("/api/enrollments/{enrollment}"),
            Some(&token),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reactivating_into_full_session_is_conflict(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, Some(1)).await;
    let first = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let second = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    create_test_enrollment(&mut tx, org, session, first, 0.0).await;
    let cancelled = create_test_enrollment(&mut tx, org, session, second, 0.0).await;
    sqlx::query("UPDATE enrollments SET status = 'cancelled' WHERE id = $1")
        .bind(cancelled)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &format!("/api/enrollments/{cancelled}"),
        Some(&token),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"],
        "Session is full (1 learners maximum)"
    );

    // other fields of a cancelled enrollment stay editable
    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &format!("/api/enrollments/{cancelled}"),
        Some(&token),
        Some(json!({ "notes": "Reporté à la session de mars" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "cancelled");
}
