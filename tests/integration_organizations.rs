mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_test_formation, create_test_organization, create_test_session,
    create_test_user, get_auth_token, send, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_system_admin_manages_organizations(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let root = create_test_user(&mut tx, "system_admin", None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &root.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/organizations",
        Some(&token),
        Some(json!({
            "name": "Institut Lumière",
            "city": "Abidjan",
            "email": "contact@lumiere.ci",
            "currency": "eur"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let org = body_json(response).await;
    assert_eq!(org["currency"], "EUR");
    let id = org["id"].as_str().unwrap().to_string();

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/organizations",
        Some(&token),
        Some(json!({ "name": "Sans email", "email": "pas-un-email" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/organizations/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/organizations/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_organization_with_sessions_cannot_be_deleted(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let root = create_test_user(&mut tx, "system_admin", None).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    create_test_session(&mut tx, org, formation, None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &root.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/organizations/{org}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Cannot delete an organization that still has sessions"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_sees_and_edits_only_own_organization(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        "/api/organizations",
        Some(&token),
        None,
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["id"], org.to_string());

    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &format!("/api/organizations/{org}"),
        Some(&token),
        Some(json!({ "director_name": "Mme Bamba" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["director_name"], "Mme Bamba");

    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &format!("/api/organizations/{other_org}"),
        Some(&token),
        Some(json!({ "director_name": "Mme Bamba" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/organizations",
        Some(&token),
        Some(json!({ "name": "Nouveau centre" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
