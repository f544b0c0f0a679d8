//! Registration, login and current-user handlers

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use todo_auth::{Registration, User};

use crate::{
    error::ApiResult,
    extract::AppJson,
    models::{LoginRequest, TokenResponse, UserResponse},
    state::AppState,
};

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<Registration>,
) -> ApiResult<impl IntoResponse> {
    let user = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Exchange a username and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let token = state.auth.login(&payload.username, &payload.password).await?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// The user the bearer token belongs to
pub async fn me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}
