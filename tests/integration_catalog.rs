mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_test_formation, create_test_organization, create_test_session,
    create_test_user, get_auth_token, send, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_formation_crud(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    create_test_formation(&mut tx, other_org, 0.0).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;
    let payload = json!({
        "name": "Gestion de projet",
        "code": "GP-01",
        "duration_hours": 21,
        "price": 250000.0
    });

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/formations",
        Some(&token),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let formation = body_json(response).await;
    assert_eq!(formation["organization_id"], org.to_string());
    let id = formation["id"].as_str().unwrap().to_string();

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/formations",
        Some(&token),
        Some(payload),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"],
        "A formation with this code already exists"
    );

    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &format!("/api/formations/{id}"),
        Some(&token),
        Some(json!({ "price": 300000.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["price"], 300000.0);
    assert_eq!(body["name"], "Gestion de projet");

    // the other organization's formation stays invisible
    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        "/api/formations",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body_json(response).await["meta"]["total"], 1);

    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/formations/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_formation_used_by_sessions_cannot_be_deleted(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    create_test_session(&mut tx, org, formation, None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/formations/{formation}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Cannot delete a formation used by sessions"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_manager_cannot_edit_catalog(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let manager = create_test_user(&mut tx, "manager", Some(org)).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &manager.email).await;

    for uri in ["/api/formations", "/api/programs"] {
        let response = send(
            setup_test_app(pool.clone()),
            "POST",
            uri,
            Some(&token),
            Some(json!({ "name": "Gestion de projet" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_programs_are_linked_to_sessions(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let org = create_test_organization(&mut tx, "Centre Formation Plus").await;
    let other_org = create_test_organization(&mut tx, "Autre Centre").await;
    let admin = create_test_user(&mut tx, "admin", Some(org)).await;
    let other_admin = create_test_user(&mut tx, "admin", Some(other_org)).await;
    let formation = create_test_formation(&mut tx, org, 0.0).await;
    let session = create_test_session(&mut tx, org, formation, None).await;
    tx.commit().await.unwrap();

    let token = get_auth_token(setup_test_app(pool.clone()), &admin.email).await;

    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/programs",
        Some(&token),
        Some(json!({
            "name": "Programme Excel",
            "content": [
                { "title": "Prise en main", "duration_hours": 3.5 },
                { "title": "Formules", "description": "SOMME, SI, RECHERCHEV", "duration_hours": 7.0 }
            ]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let program = body_json(response).await;
    assert_eq!(program["content"].as_array().unwrap().len(), 2);
    let program_id = program["id"].as_str().unwrap().to_string();

    // a module without a title is rejected
    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/programs",
        Some(&token),
        Some(json!({ "name": "Programme vide", "content": [{ "title": "" }] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let other_token = get_auth_token(setup_test_app(pool.clone()), &other_admin.email).await;
    let response = send(
        setup_test_app(pool.clone()),
        "POST",
        "/api/programs",
        Some(&other_token),
        Some(json!({ "name": "Programme étranger" })),
    )
    .await;
    let foreign_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let uri = format!("/api/sessions/{session}/programs");
    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "program_ids": [program_id, foreign_id] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        setup_test_app(pool.clone()),
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "program_ids": [program_id] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["program_ids"], json!([program_id]));

    let response = send(
        setup_test_app(pool.clone()),
        "DELETE",
        &format!("/api/programs/{program_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        setup_test_app(pool.clone()),
        "GET",
        &format!("/api/sessions/{session}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body_json(response).await["program_ids"], json!([]));
}
