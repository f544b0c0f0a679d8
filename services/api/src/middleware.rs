//! Request middleware: bearer authentication and request logging

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authentication middleware
///
/// Resolves the bearer token to a user and stores it in the request
/// extensions for handlers to pick up with `Extension<User>`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        warn!("Missing or malformed Authorization header");
        return Err(ApiError::Unauthenticated);
    };

    let user = state.auth.authenticate(bearer.token()).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Tag every request with an id, log its outcome and echo the id back
pub async fn request_logging(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let has_authorization = req.headers().contains_key(header::AUTHORIZATION);
    let span = info_span!("request", id = %request_id, %method, %path);

    async move {
        info!(authorization = has_authorization, "request started");
        let started = Instant::now();
        let mut response = next.run(req).await;

        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}
