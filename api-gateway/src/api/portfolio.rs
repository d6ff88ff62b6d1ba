//! Portfolio API handlers
//!
//! Read-only views over the authenticated user's holdings.

use std::sync::Arc;

use axum::extract::State;

use common::model::wallet::Wallet;
use ledger_service::PortfolioValuation;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// Value the authenticated user's portfolio at current prices
#[utoipa::path(
    get,
    path = "/api/v1/portfolio",
    responses(
        (status = 200, description = "Portfolio valued successfully"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    tag = "portfolio"
)]
pub async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<PortfolioValuation>, ApiError> {
    let valuation = state
        .portfolio
        .value_portfolio(user.id)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(valuation))
}

/// List the authenticated user's wallets
#[utoipa::path(
    get,
    path = "/api/v1/wallets",
    responses(
        (status = 200, description = "Wallets retrieved successfully"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    tag = "portfolio"
)]
pub async fn get_wallets(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<ApiListResponse<Wallet>, ApiError> {
    let wallets = state
        .portfolio
        .holdings(user.id)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiListResponse::new(wallets))
}
