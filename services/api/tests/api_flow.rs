//! End-to-end HTTP tests driving the router in-process

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

use todo_api::{AppState, config::build_allowed_origins, create_router};
use todo_auth::{HasherConfig, JwtConfig, PasswordService, TokenService};
use todo_common::{DatabaseConfig, init_pool, run_migrations};

async fn test_app() -> Router {
    let pool = init_pool(&DatabaseConfig::in_memory()).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let passwords = PasswordService::from_config(&HasherConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        pbkdf2_rounds: 1_000,
    })
    .unwrap();
    let tokens = TokenService::new(JwtConfig {
        secret_key: "integration-test-secret".to_string(),
        access_token_expiry: Duration::from_secs(30 * 60),
    });

    create_router(
        AppState::new(pool, tokens, passwords),
        &build_allowed_origins(None),
    )
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn register_and_login(app: &Router, username: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": username, "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_root_and_health() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Welcome to Todo List API"}));

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_register_login_me() {
    let app = test_app().await;

    let (status, user) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "alice", "email": "alice@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "alice");
    assert!(user["id"].is_i64());
    assert!(user.get("hashed_password").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "alice", "email": "other@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_username");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "alicia", "email": "alice@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_email");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "alice", "password": "wrong-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (_, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "alice", "password": "secret1"})),
    )
    .await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, me) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);
    assert_eq!(me["email"], "alice@example.com");
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/todos").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let (status, body) = send(&app, "GET", "/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_todo_crud() {
    let app = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let (status, todo) = send(
        &app,
        "POST",
        "/todos",
        Some(&token),
        Some(json!({"title": "  Buy milk  ", "tags": "home", "attachments": ["data:,hi"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(todo["title"], "Buy milk");
    assert_eq!(todo["status"], "TODO");
    assert_eq!(todo["priority"], "MEDIUM");
    assert_eq!(todo["type"], "TASK");
    assert_eq!(todo["attachments"], json!(["data:,hi"]));
    let id = todo["id"].as_i64().unwrap();

    let (status, fetched) = send(&app, "GET", &format!("/todos/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Buy milk");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/todos/{id}"),
        Some(&token),
        Some(json!({"status": "DONE"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "DONE");
    assert_eq!(updated["title"], "Buy milk");
    assert_eq!(updated["tags"], "home");

    let (status, body) = send(&app, "DELETE", &format!("/todos/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Todo deleted successfully");

    let (status, body) = send(&app, "GET", &format!("/todos/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Todo not found");
}

#[tokio::test]
async fn test_todos_are_isolated_between_users() {
    let app = test_app().await;
    let alice = register_and_login(&app, "alice").await;
    let bob = register_and_login(&app, "bob").await;

    let (_, todo) = send(
        &app,
        "POST",
        "/todos",
        Some(&alice),
        Some(json!({"title": "alice only"})),
    )
    .await;
    let uri = format!("/todos/{}", todo["id"]);

    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "PUT", &uri, Some(&bob), Some(json!({"title": "mine"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = send(&app, "GET", "/todos", Some(&bob), None).await;
    assert_eq!(page["total"], 0);

    let (status, still_there) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(still_there["title"], "alice only");
}

#[tokio::test]
async fn test_pagination_metadata() {
    let app = test_app().await;
    let token = register_and_login(&app, "alice").await;

    for i in 0..25 {
        let (status, _) = send(
            &app,
            "POST",
            "/todos/",
            Some(&token),
            Some(json!({"title": format!("item {i}")})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = send(&app, "GET", "/todos?skip=0&limit=10", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 25);
    assert_eq!(page["page"], 1);
    assert_eq!(page["per_page"], 10);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["todos"].as_array().unwrap().len(), 10);
    assert_eq!(page["todos"][0]["title"], "item 24");

    let (_, page) = send(&app, "GET", "/todos/?skip=20&limit=10", Some(&token), None).await;
    assert_eq!(page["page"], 3);
    assert_eq!(page["todos"].as_array().unwrap().len(), 5);

    for uri in ["/todos?limit=0", "/todos?limit=101", "/todos?skip=-1"] {
        let (status, body) = send(&app, "GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_filters_and_stats() {
    let app = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let yesterday = (chrono::Utc::now() - chrono::Duration::days(1)).to_rfc3339();
    let tomorrow = (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339();

    for body in [
        json!({"title": "late", "due_date": yesterday}),
        json!({"title": "late but done", "status": "DONE", "due_date": yesterday}),
        json!({"title": "upcoming", "status": "DOING", "due_date": tomorrow}),
        json!({"title": "Journal", "type": "DIARY", "content": "Walked the Dog"}),
    ] {
        let (status, _) = send(&app, "POST", "/todos", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, page) = send(&app, "GET", "/todos?overdue_only=true", Some(&token), None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["todos"][0]["title"], "late");

    let (_, page) = send(&app, "GET", "/todos?type=DIARY", Some(&token), None).await;
    assert_eq!(page["total"], 1);

    let (_, page) = send(&app, "GET", "/todos?search=Dog", Some(&token), None).await;
    assert_eq!(page["total"], 1);
    let (_, page) = send(&app, "GET", "/todos?search=dog", Some(&token), None).await;
    assert_eq!(page["total"], 0);

    let (status, body) = send(&app, "GET", "/todos?status=done", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, stats) = send(&app, "GET", "/todos/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({
            "total": 4,
            "todo_count": 2,
            "doing_count": 1,
            "done_count": 1,
            "overdue_count": 1,
        })
    );
}

#[tokio::test]
async fn test_invalid_todo_payloads() {
    let app = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/todos",
        Some(&token),
        Some(json!({"title": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(
        &app,
        "POST",
        "/todos",
        Some(&token),
        Some(json!({"title": "x".repeat(201)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/todos",
        Some(&token),
        Some(json!({"priority": "HIGH"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (_, todo) = send(
        &app,
        "POST",
        "/todos",
        Some(&token),
        Some(json!({"title": "keep"})),
    )
    .await;
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/todos/{}", todo["id"]),
        Some(&token),
        Some(json!({"title": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparsable_todo_id_is_a_validation_error() {
    let app = test_app().await;
    let token = register_and_login(&app, "alice").await;

    for uri in ["/todos/abc", "/todos/99999999999999999999"] {
        let response = app
            .clone()
            .oneshot(
                Request::get(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json",
            "{uri}"
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "validation_error", "{uri}");
        assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));
    }

    let (status, body) = send(
        &app,
        "PUT",
        "/todos/abc",
        Some(&token),
        Some(json!({"status": "DONE"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(&app, "DELETE", "/todos/abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_cors_and_request_id_headers() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/todos")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let response = app
        .clone()
        .oneshot(
            Request::get("/health")
                .header(header::ORIGIN, "https://evil.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
    assert!(response.headers().contains_key("x-request-id"));
}
