mod common;

use axum::http::StatusCode;
use common::{
    PASSWORD, body_json, create_test_organization, create_test_user, generate_unique_email,
    get_auth_token, send, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_creates_trainer_in_own_organization(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;
    let email = generate_unique_email();

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/users",
        Some(&token),
        Some(json!({
            "first_name": "Kofi",
            "last_name": "Mensah",
            "email": email,
            "password": PASSWORD,
            "role": "trainer",
            // ignored for organization members
            "organization_id": other_org
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["role"], "trainer");
    assert_eq!(body["organization_id"], org.to_string());
    assert!(body.get("password_hash").is_none());

    // the new account can log in
    let trainer_token = get_auth_token(setup_test_app(pool.clone()), &email).await;
    assert!(!trainer_token.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_user_email_is_conflict(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    let existing = create_test_user(&mut tx, "manager", Some(org)).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/users",
        Some(&token),
        Some(json!({
            "first_name": "Kofi",
            "last_name": "Mensah",
            "email": existing.email,
            "password": PASSWORD,
            "role": "manager"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"],
        "A user with this email already exists"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_manager_cannot_create_users(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/users",
        Some(&token),
        Some(json!({
            "first_name": "Kofi",
            "last_name": "Mensah",
            "email": generate_unique_email(),
            "password": PASSWORD,
            "role": "trainer"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_users_is_scoped_to_organization(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    create_test_user(&mut tx, "trainer", Some(org)).await;
    create_test_user(&mut tx, "trainer", Some(other_org)).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        "/api/users?role=trainer",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["organization_id"], org.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deactivated_user_cannot_log_in(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    let trainer = create_test_user(&mut tx, "trainer", Some(org)).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/users/{}", trainer.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": trainer.email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // an admin cannot lock themselves out
    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/users/{}", admin.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
