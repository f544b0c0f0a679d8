//! Todo handlers, all scoped to the authenticated user

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use todo_auth::User;

use crate::{
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath, AppQuery},
    models::todo::{Todo, TodoCreate, TodoStats, TodoUpdate},
    query::{TodoListResponse, TodoQuery},
    state::AppState,
};

fn not_found() -> ApiError {
    ApiError::NotFound("Todo not found".to_string())
}

/// Create a todo
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppJson(payload): AppJson<TodoCreate>,
) -> ApiResult<impl IntoResponse> {
    let payload = payload.validate().map_err(ApiError::Validation)?;
    let todo = state.todo_repository.create(user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// List the user's todos with filters and pagination
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppQuery(query): AppQuery<TodoQuery>,
) -> ApiResult<Json<TodoListResponse>> {
    let (filter, pagination) = query.into_parts().map_err(ApiError::Validation)?;
    let (todos, total) = state
        .todo_repository
        .list(user.id, &filter, &pagination, Utc::now())
        .await?;
    Ok(Json(TodoListResponse::new(todos, total, &pagination)))
}

/// Aggregate counts over the user's todos
pub async fn todo_stats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<TodoStats>> {
    let stats = state.todo_repository.stats(user.id, Utc::now()).await?;
    Ok(Json(stats))
}

/// Get a todo by ID
pub async fn get_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<Todo>> {
    let todo = state
        .todo_repository
        .get(user.id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(todo))
}

/// Partially update a todo
pub async fn update_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
    AppJson(patch): AppJson<TodoUpdate>,
) -> ApiResult<Json<Todo>> {
    let patch = patch.validate().map_err(ApiError::Validation)?;
    let todo = state
        .todo_repository
        .update(user.id, id, patch)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(todo))
}

/// Delete a todo
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<impl IntoResponse> {
    if !state.todo_repository.delete(user.id, id).await? {
        return Err(not_found());
    }
    Ok(Json(json!({ "message": "Todo deleted successfully" })))
}
