//! Workspace, task and account flows against a real Postgres. Run with
//! `TEST_DATABASE_URL=... cargo test -- --ignored`.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
#[ignore]
async fn personal_workspace_is_created_once() {
    let app = TestApp::live().await;
    let (_, token) = app.register("Solo").await;

    let create = |title: &'static str| {
        let app = &app;
        let token = token.clone();
        async move {
            app.call(
                Method::POST,
                "/api/tasks",
                Some(&token),
                Some(json!({ "title": title })),
            )
            .await
        }
    };

    let (a, b) = tokio::join!(create("first"), create("second"));
    assert_eq!(a.status, StatusCode::CREATED, "{:?}", a.body);
    assert_eq!(b.status, StatusCode::CREATED, "{:?}", b.body);
    assert_eq!(a.body["workspace_id"], b.body["workspace_id"]);
    assert_eq!(a.body["workspace_name"], json!("Personal"));

    let workspaces = app
        .call(Method::GET, "/api/workspaces", Some(&token), None)
        .await;
    let personal: Vec<_> = workspaces
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter(|w| w["is_personal"] == json!(true))
        .collect();
    assert_eq!(personal.len(), 1);
    assert_eq!(personal[0]["role"], json!("owner"));
}

#[tokio::test]
#[ignore]
async fn outsiders_cannot_see_workspace_tasks() {
    let app = TestApp::live().await;
    let (_, owner) = app.register("Owner").await;
    let (_, outsider) = app.register("Outsider").await;

    let ws = app
        .call(
            Method::POST,
            "/api/workspaces",
            Some(&owner),
            Some(json!({ "name": "Launch" })),
        )
        .await;
    assert_eq!(ws.status, StatusCode::CREATED, "{:?}", ws.body);
    let ws_id = ws.body["id"].as_str().unwrap().to_string();

    let task = app
        .call(
            Method::POST,
            "/api/tasks",
            Some(&owner),
            Some(json!({ "title": "Ship it", "workspace_id": ws_id, "priority": "high" })),
        )
        .await;
    assert_eq!(task.status, StatusCode::CREATED, "{:?}", task.body);
    let task_id = task.body["id"].as_str().unwrap().to_string();

    let peek = app
        .call(Method::GET, &format!("/api/tasks/{task_id}"), Some(&outsider), None)
        .await;
    assert_eq!(peek.status, StatusCode::NOT_FOUND);

    let done = app
        .call(
            Method::PATCH,
            &format!("/api/tasks/{task_id}"),
            Some(&owner),
            Some(json!({ "status": "done" })),
        )
        .await;
    assert_eq!(done.status, StatusCode::OK, "{:?}", done.body);
    assert!(done.body["completed_at"].is_string());

    let dashboard = app
        .call(
            Method::GET,
            &format!("/api/dashboard?workspace_id={ws_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["total_tasks"], json!(1));
    assert_eq!(dashboard.body["by_status"]["done"], json!(1));
}

#[tokio::test]
#[ignore]
async fn documents_can_be_starred_and_filtered_by_tag() {
    let app = TestApp::live().await;
    let (_, token) = app.register("Writer").await;

    let doc = app
        .call(
            Method::POST,
            "/api/documents",
            Some(&token),
            Some(json!({ "title": "Roadmap", "tags": ["Planning", " planning ", "Q3"] })),
        )
        .await;
    assert_eq!(doc.status, StatusCode::CREATED, "{:?}", doc.body);
    assert_eq!(doc.body["tags"], json!(["planning", "q3"]));
    let doc_id = doc.body["id"].as_str().unwrap().to_string();

    let starred = app
        .call(
            Method::POST,
            &format!("/api/documents/{doc_id}/star"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(starred.body["starred"], json!(true));

    let by_tag = app
        .call(Method::GET, "/api/documents?tag=Q3", Some(&token), None)
        .await;
    assert_eq!(by_tag.body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore]
async fn deactivated_accounts_are_locked_out() {
    let app = TestApp::live().await;
    let (_, admin_token) = app.register_with_role("Root", "super-admin").await;
    let (user_id, user_token) = app.register("Leaver").await;

    let email: (String,) = sqlx::query_as("SELECT email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let resp = app
        .call(
            Method::PATCH,
            &format!("/api/admin/users/{user_id}/active"),
            Some(&admin_token),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);

    let login = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email.0, "password": PASSWORD })),
        )
        .await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);

    // Existing tokens stop working as well.
    let me = app
        .call(Method::GET, "/api/auth/me", Some(&user_token), None)
        .await;
    assert_eq!(me.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn viewers_cannot_star_shared_documents() {
    let app = TestApp::live().await;
    let (_, owner) = app.register("Editor").await;
    let (viewer_id, viewer) = app.register("Reader").await;

    let (viewer_email,): (String,) = sqlx::query_as("SELECT email FROM users WHERE id = $1")
        .bind(viewer_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let ws = app
        .call(
            Method::POST,
            "/api/workspaces",
            Some(&owner),
            Some(json!({ "name": "Docs" })),
        )
        .await;
    let ws_id = ws.body["id"].as_str().unwrap().to_string();

    let added = app
        .call(
            Method::POST,
            &format!("/api/workspaces/{ws_id}/members"),
            Some(&owner),
            Some(json!({ "email": viewer_email, "role": "viewer" })),
        )
        .await;
    assert_eq!(added.status, StatusCode::CREATED, "{:?}", added.body);

    let doc = app
        .call(
            Method::POST,
            "/api/documents",
            Some(&owner),
            Some(json!({ "title": "Handbook", "workspace_id": ws_id })),
        )
        .await;
    assert_eq!(doc.status, StatusCode::CREATED, "{:?}", doc.body);
    let doc_id = doc.body["id"].as_str().unwrap().to_string();

    let read = app
        .call(Method::GET, &format!("/api/documents/{doc_id}"), Some(&viewer), None)
        .await;
    assert_eq!(read.status, StatusCode::OK);

    let star = app
        .call(
            Method::POST,
            &format!("/api/documents/{doc_id}/star"),
            Some(&viewer),
            None,
        )
        .await;
    assert_eq!(star.status, StatusCode::FORBIDDEN);

    let after = app
        .call(Method::GET, &format!("/api/documents/{doc_id}"), Some(&owner), None)
        .await;
    assert_eq!(after.body["starred"], json!(false));
}
