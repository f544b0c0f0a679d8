//! API service routes

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, warn};

use crate::{
    middleware::{REQUEST_ID_HEADER, auth_middleware, request_logging},
    state::AppState,
};

pub mod auth;
pub mod todos;

/// Create the router for the API service
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route("/todos/", get(todos::list_todos).post(todos::create_todo))
        .route("/todos/stats", get(todos::todo_stats))
        .route(
            "/todos/:id",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected_routes)
        .layer(cors_layer(cors_origins))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}

/// CORS for the configured browser origins, with credentials allowed
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // Credentialed CORS cannot use wildcards, so methods and headers are mirrored
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to Todo List API" }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match todo_common::health_check(&state.db_pool).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Ok(false) | Err(_) => {
            error!("Health check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy" })),
            )
        }
    }
}
