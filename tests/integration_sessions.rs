mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_test_enrollment, create_test_formation, create_test_organization,
    create_test_session, create_test_slot, create_test_student, create_test_user,
    days_from_today, get_auth_token, send, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_session(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 150_000.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/sessions",
        Some(&token),
        Some(json!({
            "name": "Excel avancé - juin",
            "formation_id": formation,
            "start_date": days_from_today(20),
            "end_date": days_from_today(22),
            "start_time": "09:00",
            "end_time": "17:00",
            "capacity_max": 12,
            "location": "Salle A"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Excel avancé - juin");
    assert_eq!(body["status"], "planned");
    assert_eq!(body["capacity_max"], 12);
    assert_eq!(body["organization_id"], org.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_session_rejects_reversed_dates(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/sessions",
        Some(&token),
        Some(json!({
            "name": "Dates inversées",
            "formation_id": formation,
            "start_date": days_from_today(10),
            "end_date": days_from_today(5)
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "End date must be on or after start date");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_session_of_another_organization_is_not_found(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    let formation = create_test_formation(&mut tx, other_org, 0.0).await;
    let session = create_test_session(&mut tx, other_org, formation, None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{session}"),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_generate_slots_is_idempotent(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;
    let uri = format!("/api/sessions/{session}/slots/generate");
    let template = json!({ "time_slot_type": "both", "skip_weekends": false });

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &uri,
        Some(&token),
        Some(template.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    // three days, morning and afternoon
    assert_eq!(body["created"], 6);
    assert_eq!(body["skipped"], 0);

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &uri,
        Some(&token),
        Some(template),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["created"], 0);
    assert_eq!(body["skipped"], 6);

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "time_slot_type": "morning", "skip_weekends": false, "replace_existing": true })),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["created"], 3);

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{session}/slots"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let slots = body_json(response).await;
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert!(slots.iter().all(|s| s["time_slot"] == "morning"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_trainer_cannot_generate_slots(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let trainer = create_test_user(&mut tx, "trainer", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &trainer.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/sessions/{session}/slots/generate"),
        Some(&token),
        Some(json!({})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_capacity_cannot_drop_below_active_enrollments(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, Some(5)).await;
    let first = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    let second = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    create_test_enrollment(&mut tx, org, session, first, 0.0).await;
    create_test_enrollment(&mut tx, org, session, second, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;
    let uri = format!("/api/sessions/{session}");

    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "capacity_max": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Capacity cannot be lower than the 2 active enrollments"
    );

    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "capacity_max": 2 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["capacity_max"], 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_slot_trainer_must_belong_to_session_organization(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    let trainer = create_test_user(&mut tx, "trainer", Some(org)).await;
    let outsider = create_test_user(&mut tx, "trainer", Some(other_org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let slot = create_test_slot(&mut tx, session, days_from_today(14)).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;
    let generate = format!("/api/sessions/{session}/slots/generate");

    // another organization's trainer, then an id that matches no user at all
    for teacher_id in [outsider.id, Uuid::new_v4()] {
        let response = send(
            setup_test_app(pool.clone()),
            "POST",
            &generate,
            Some(&token),
            Some(json!({
                "time_slot_type": "morning",
                "skip_weekends": false,
                "teacher_id": teacher_id
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Trainer and managers must belong to the session's organization"
        );

        let response = send(
            setup_test_app(pool.clone()),
            "PUT",
            &format!("/api/slots/{slot}"),
            Some(&token),
            Some(json!({ "teacher_id": teacher_id })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &format!("/api/slots/{slot}"),
        Some(&token),
        Some(json!({ "teacher_id": trainer.id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["teacher_id"], trainer.id.to_string());

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &generate,
        Some(&token),
        Some(json!({
            "time_slot_type": "afternoon",
            "skip_weekends": false,
            "teacher_id": trainer.id
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["created"], 3);
}
