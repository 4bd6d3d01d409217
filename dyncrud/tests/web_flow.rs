//! HTTP boundary tests: form POST, redirect-after-post, inline errors

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use dyncrud::crud::CrudHandler;
use dyncrud::forms::render::CSRF_FIELD;
use dyncrud::testing::sqlite_pool_with_schema;
use dyncrud::web;

const DDL: &str = "
CREATE TABLE notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title VARCHAR(120) NOT NULL,
    body TEXT
)";

async fn server() -> (TestServer, Arc<CrudHandler>) {
    let pool = sqlite_pool_with_schema(DDL).await.expect("schema setup");
    let handler = Arc::new(CrudHandler::new(pool, "notes").await.expect("introspection"));
    let app = axum::Router::new().nest("/notes", web::router("/notes", handler.clone()));
    (TestServer::new(app).expect("test server"), handler)
}

#[tokio::test]
async fn new_form_renders() {
    let (server, _) = server().await;
    let response = server.get("/notes/new").await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("<form method=\"POST\" action=\"/notes\""));
    assert!(html.contains("name=\"title\""));
    assert!(html.contains(&format!("name=\"{CSRF_FIELD}\"")));
}

#[tokio::test]
async fn post_create_redirects_to_detail() {
    let (server, handler) = server().await;

    let response = server
        .post("/notes")
        .form(&[
            ("title", "First note"),
            ("body", "hello"),
            (CSRF_FIELD, handler.csrf().generate().as_str()),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    let location = response.header("location");
    assert_eq!(location.to_str().unwrap(), "/notes/1");

    let detail = server.get("/notes/1").await;
    detail.assert_status_ok();
    assert!(detail.text().contains("First note"));

    let list = server.get("/notes").await;
    list.assert_status_ok();
    assert!(list.text().contains("First note"));
}

#[tokio::test]
async fn post_invalid_rerenders_with_errors() {
    let (server, handler) = server().await;

    let response = server
        .post("/notes")
        .form(&[
            ("body", "no title"),
            (CSRF_FIELD, handler.csrf().generate().as_str()),
        ])
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text();
    assert!(html.contains("Title is required"));
    assert!(html.contains("<form"));
}

#[tokio::test]
async fn post_without_csrf_is_forbidden() {
    let (server, _) = server().await;
    let response = server.post("/notes").form(&[("title", "x")]).await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn edit_and_update_flow() {
    let (server, handler) = server().await;

    server
        .post("/notes")
        .form(&[
            ("title", "Draft"),
            (CSRF_FIELD, handler.csrf().generate().as_str()),
        ])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let form = server.get("/notes/1/edit").await;
    form.assert_status_ok();
    assert!(form.text().contains("value=\"Draft\""));
    assert!(form.text().contains("name=\"id\" value=\"1\""));

    let response = server
        .post("/notes")
        .form(&[
            ("id", "1"),
            ("title", "Final"),
            (CSRF_FIELD, handler.csrf().generate().as_str()),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location").to_str().unwrap(), "/notes/1");

    assert!(server.get("/notes/1").await.text().contains("Final"));
}

#[tokio::test]
async fn delete_redirects_to_list() {
    let (server, handler) = server().await;
    server
        .post("/notes")
        .form(&[
            ("title", "Doomed"),
            (CSRF_FIELD, handler.csrf().generate().as_str()),
        ])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let response = server.post("/notes/1/delete").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location").to_str().unwrap(), "/notes");

    server.get("/notes/1").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_content_type_is_rejected() {
    let (server, _) = server().await;
    let response = server.post("/notes").text("raw body").await;
    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
}
