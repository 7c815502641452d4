//! Authentication API Routes

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::state::AppState;

/// Pull the session token out of the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()
        .map(|value| value.trim_start_matches("Bearer ").trim().to_string())
        .filter(|token| !token.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Authenticate and return a session token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(Error::Validation(
            "username and password required".to_string(),
        ));
    }

    match state.auth.authenticate(&req.username, &req.password).await {
        Some(token) => Ok(Json(json!({
            "success": true,
            "token": token,
            "username": req.username,
        }))),
        None => Err(Error::Unauthorized("invalid credentials".to_string())),
    }
}

/// Invalidate the current session token
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        state.auth.logout(&token).await;
    }
    Json(json!({ "success": true }))
}

/// Check authentication status
pub async fn auth_status(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let username = match bearer_token(&headers) {
        Some(token) => state.auth.validate_session(&token).await,
        None => None,
    };

    Json(json!({
        "authenticated": username.is_some(),
        "username": username,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChangeCredentialsRequest {
    username: Option<String>,
    password: Option<String>,
    current_password: Option<String>,
}

/// Change username and/or password; requires a valid session and the
/// current password
pub async fn change_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChangeCredentialsRequest>,
) -> Result<impl IntoResponse> {
    let token = bearer_token(&headers)
        .ok_or_else(|| Error::Unauthorized("missing session token".to_string()))?;
    let current_password = req
        .current_password
        .ok_or_else(|| Error::Validation("current password required".to_string()))?;

    state
        .auth
        .change_credentials(
            &token,
            req.username.as_deref().filter(|u| !u.is_empty()),
            req.password.as_deref().filter(|p| !p.is_empty()),
            &current_password,
        )
        .await?;

    Ok(Json(json!({ "success": true })))
}
