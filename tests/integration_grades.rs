mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_test_enrollment, create_test_formation, create_test_organization,
    create_test_session, create_test_student, create_test_user, get_auth_token, send,
    setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_grades_and_stats(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let trainer = create_test_user(&mut tx, "trainer", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let student = create_test_student(&mut tx, org, "Awa", "Koné", None).await;
    create_test_enrollment(&mut tx, org, session, student, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &trainer.email).await;
    let uri = format!("/api/sessions/{session}/grades");

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &uri,
        Some(&token),
        Some(json!({
            "student_id": student,
            "subject": "Tableaux croisés",
            "assessment_type": "exam",
            "score": 15.0
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let exam = body_json(response).await;
    assert_eq!(exam["max_score"], 20.0);
    assert_eq!(exam["teacher_id"], trainer.id.to_string());

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &uri,
        Some(&token),
        Some(json!({
            "student_id": student,
            "subject": "Formules",
            "assessment_type": "quiz",
            "score": 8.0,
            "max_score": 10.0
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let quiz = body_json(response).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("{uri}/stats"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["count"], 2);
    assert_eq!(stats["average_score"], 11.5);
    assert_eq!(stats["average_percentage"], 77.5);
    assert_eq!(stats["average_on_20"], 15.5);
    assert_eq!(stats["by_assessment_type"]["quiz"]["average_percentage"], 80.0);

    // the merged score may not exceed the stored maximum
    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &format!("/api/grades/{}", quiz["id"].as_str().unwrap()),
        Some(&token),
        Some(json!({ "score": 12.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/grades/{}", quiz["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("{uri}/stats"),
        Some(&token),
        None,
    )
    .await;
    let stats = body_json(response).await;
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["average_on_20"], 15.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_grade_requires_enrollment(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let trainer = create_test_user(&mut tx, "trainer", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    let student = create_test_student(&mut tx, org, "Yao", "Kouassi", None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &trainer.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        &format!("/api/sessions/{session}/grades"),
        Some(&token),
        Some(json!({
            "student_id": student,
            "subject": "Formules",
            "assessment_type": "quiz",
            "score": 12.0
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Student is not enrolled in this session"
    );
}
