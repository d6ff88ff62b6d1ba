//! Authentication API handlers
//!
//! Registration, login, and logout for regular users. Successful logins
//! return a bearer token that the other endpoints expect in the
//! Authorization header.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use common::model::user::User;

use crate::api::response::ApiResponse;
use crate::auth::{hash_password, verify_password, Role};
use crate::error::ApiError;
use crate::AppState;

/// Registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// Login result: the bearer token plus the authenticated user
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: Uuid,
    /// The authenticated user
    pub user: User,
}

/// Logout result
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    /// Whether an active session was revoked
    pub revoked: bool,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully"),
        (status = 400, description = "Invalid registration data or email already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    if request.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password).map_err(ApiError::Common)?;

    let user = state
        .users
        .register_user(&request.name, &request.email, &password_hash)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(user))
}

/// Log a user in and issue a session token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 401, description = "Invalid email or password"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    let user = state
        .users
        .get_user_by_email(&request.email)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::Unauthorized("invalid email or password".to_string()))?;

    let valid = verify_password(&request.password, &user.password_hash)
        .map_err(ApiError::Common)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "invalid email or password".to_string(),
        ));
    }

    let token = state.sessions.issue(user.id, Role::User);
    tracing::info!("User {} logged in", user.id);

    Ok(ApiResponse::new(LoginResponse { token, user }))
}

/// Revoke the caller's session token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Session revoked if one was active")
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<ApiResponse<LogoutResponse>, ApiError> {
    let revoked = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
        .map(|token| state.sessions.revoke(token))
        .unwrap_or(false);

    Ok(ApiResponse::new(LogoutResponse { revoked }))
}
