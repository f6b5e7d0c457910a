//! Session middleware for protected endpoints.
//!
//! Resolves the caller's session from `X-User-Id`, then `Authorization:
//! Bearer <id>`, then the `userId` query parameter, and injects the
//! [`Session`] into request extensions. Every authenticated request also
//! refreshes the caller's idle-activity timestamp.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};
use holdem_rooms::store::session::Session;

use super::{ApiError, AppState};

pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = extract_user_id(&request)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized"))?;

    let session: Session = state
        .store
        .get_user(&user_id)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized"))?;

    state.store.touch_user(&session.user_id);
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn extract_user_id(request: &Request) -> Option<String> {
    if let Some(id) = request
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(id.to_string());
    }
    if let Some(token) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|v| !v.is_empty())
    {
        return Some(token.to_string());
    }
    request
        .uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("userId="))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
