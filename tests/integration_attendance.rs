mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_test_enrollment, create_test_formation, create_test_organization,
    create_test_session, create_test_slot, create_test_student, create_test_user,
    days_from_today, get_auth_token, send, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_record_attendance_and_stats(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let trainer = create_test_user(&mut tx, "trainer", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let first_day = create_test_slot(&mut tx, session, days_from_today(14)).await;
    let second_day = create_test_slot(&mut tx, session, days_from_today(15)).await;
    let awa = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let yao = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    create_test_enrollment(&mut tx, org, session, awa, 0.0).await;
    create_test_enrollment(&mut tx, org, session, yao, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &trainer.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/slots/{first_day}/attendance"),
        Some(&token),
        Some(json!({ "records": [
            { "student_id": awa, "status": "present" },
            { "student_id": yao, "status": "present" }
        ]})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

    // marking again overwrites the previous mark
    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/slots/{first_day}/attendance"),
        Some(&token),
        Some(json!({ "records": [
            { "student_id": yao, "status": "absent", "notes": "Malade" }
        ]})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/slots/{second_day}/attendance"),
        Some(&token),
        Some(json!({ "records": [
            { "student_id": awa, "status": "late" },
            { "student_id": yao, "status": "excused" }
        ]})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/slots/{first_day}/attendance"),
        Some(&token),
        None,
    )
    .await;
    let entries = body_json(response).await;
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["last_name"], "Kouassi");
    assert_eq!(entries[1]["status"], "absent");
    assert_eq!(entries[1]["notes"], "Malade");

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{session}/attendance/stats"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["totals"]["present"], 1);
    assert_eq!(stats["totals"]["absent"], 1);
    assert_eq!(stats["totals"]["late"], 1);
    assert_eq!(stats["totals"]["excused"], 1);
    assert_eq!(stats["totals"]["total"], 4);
    assert_eq!(stats["overall_rate"], 50);
    assert_eq!(stats["students"][0]["last_name"], "Koné");
    assert_eq!(stats["students"][0]["rate"], 100);
    assert_eq!(stats["students"][1]["rate"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attendance_requires_enrollment(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let trainer = create_test_user(&mut tx, "trainer", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let slot = create_test_slot(&mut tx, session, days_from_today(14)).await;
    let enrolled = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let stranger = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    create_test_enrollment(&mut tx, org, session, enrolled, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &trainer.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/slots/{slot}/attendance"),
        Some(&token),
        Some(json!({ "records": [
            { "student_id": enrolled, "status": "present" },
            { "student_id": stranger, "status": "present" }
        ]})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        format!("Student {stranger} is not enrolled in this session")
    );

    // nothing was written for the enrolled learner either
    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/slots/{slot}/attendance"),
        Some(&token),
        None,
    )
    .await;
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}
