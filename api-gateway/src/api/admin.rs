//! Admin API handlers
//!
//! Admin login, currency registration, price recording, and the user
//! listing. Admin sessions are separate from user sessions; a user token
//! cannot call these endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use common::model::currency::Cryptocurrency;
use common::model::price::MarketPrice;
use common::model::user::{AdminUser, User};

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::auth::{hash_password, verify_password, AuthAdmin, Role};
use crate::error::ApiError;
use crate::AppState;

/// Admin registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminRegisterRequest {
    /// Login username
    pub username: String,
    /// Plaintext password, hashed before storage
    pub password: String,
}

/// Admin login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    /// Login username
    pub username: String,
    /// Plaintext password
    pub password: String,
}

/// Admin login result
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminLoginResponse {
    /// Bearer token for admin endpoints
    pub token: Uuid,
    /// The authenticated admin
    pub admin: AdminUser,
}

/// Currency registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCurrencyRequest {
    /// Full name (e.g., "Bitcoin")
    pub name: String,
    /// Ticker symbol (e.g., "BTC")
    pub symbol: String,
    /// Blockchain family
    pub blockchain: Option<String>,
    /// Launch date
    pub launch_date: Option<NaiveDate>,
}

/// Price recording request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPriceRequest {
    /// Unit price as a decimal string, e.g. "67421.55"
    pub price: String,
}

/// Create an admin account
#[utoipa::path(
    post,
    path = "/api/v1/admin/register",
    request_body = AdminRegisterRequest,
    responses(
        (status = 200, description = "Admin created successfully"),
        (status = 400, description = "Invalid data or username already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "admin"
)]
pub async fn admin_register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminRegisterRequest>,
) -> Result<ApiResponse<AdminUser>, ApiError> {
    if request.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password).map_err(ApiError::Common)?;

    let admin = state
        .users
        .create_admin(&request.username, &password_hash)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(admin))
}

/// Log an admin in and issue a session token
#[utoipa::path(
    post,
    path = "/api/v1/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 401, description = "Invalid username or password"),
        (status = 500, description = "Internal server error")
    ),
    tag = "admin"
)]
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<ApiResponse<AdminLoginResponse>, ApiError> {
    let admin = state
        .users
        .get_admin_by_username(&request.username)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::Unauthorized("invalid username or password".to_string()))?;

    let valid = verify_password(&request.password, &admin.password_hash)
        .map_err(ApiError::Common)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "invalid username or password".to_string(),
        ));
    }

    let token = state.sessions.issue(admin.id, Role::Admin);
    tracing::info!("Admin {} logged in", admin.username);

    Ok(ApiResponse::new(AdminLoginResponse { token, admin }))
}

/// Register a new tradable currency
#[utoipa::path(
    post,
    path = "/api/v1/admin/currencies",
    request_body = CreateCurrencyRequest,
    responses(
        (status = 200, description = "Currency created successfully"),
        (status = 400, description = "Invalid data or symbol already registered"),
        (status = 401, description = "Not authenticated as admin"),
        (status = 500, description = "Internal server error")
    ),
    tag = "admin"
)]
pub async fn create_currency(
    State(state): State<Arc<AppState>>,
    AuthAdmin(_admin): AuthAdmin,
    Json(request): Json<CreateCurrencyRequest>,
) -> Result<ApiResponse<Cryptocurrency>, ApiError> {
    let currency = state
        .pricing
        .create_currency(
            &request.name,
            &request.symbol,
            request.blockchain,
            request.launch_date,
        )
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(currency))
}

/// Record a new market price observation for a currency
#[utoipa::path(
    post,
    path = "/api/v1/admin/currencies/{id}/prices",
    params(
        ("id" = Uuid, Path, description = "Currency ID")
    ),
    request_body = RecordPriceRequest,
    responses(
        (status = 200, description = "Price recorded successfully"),
        (status = 400, description = "Invalid price"),
        (status = 401, description = "Not authenticated as admin"),
        (status = 404, description = "Currency not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "admin"
)]
pub async fn record_price(
    State(state): State<Arc<AppState>>,
    AuthAdmin(_admin): AuthAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPriceRequest>,
) -> Result<ApiResponse<MarketPrice>, ApiError> {
    let price = Decimal::from_str(request.price.trim()).map_err(|_| {
        ApiError::BadRequest(format!("invalid price: {:?}", request.price))
    })?;

    let observation = state
        .pricing
        .record_price(id, price)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(observation))
}

/// List all registered users
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses(
        (status = 200, description = "Users retrieved successfully"),
        (status = 401, description = "Not authenticated as admin"),
        (status = 500, description = "Internal server error")
    ),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<ApiListResponse<User>, ApiError> {
    let users = state.users.list_users().await.map_err(ApiError::Common)?;

    Ok(ApiListResponse::new(users))
}
