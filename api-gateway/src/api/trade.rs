//! Trade API handlers
//!
//! Buy and sell settlement plus the order and transaction listings. The
//! trade side is implicit in the endpoint; the quantity arrives as a
//! decimal string and is validated before any service call.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use common::decimal::parse_trade_quantity;
use common::model::trade::{Order, Transaction};
use ledger_service::Settlement;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// Trade request: the quantity is a decimal string with at most 2 decimal
/// places
#[derive(Debug, Deserialize, ToSchema)]
pub struct TradeRequest {
    /// Currency to trade
    pub currency_id: Uuid,
    /// Quantity to trade, e.g. "0.50"
    pub quantity: String,
}

/// Listing query parameters
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    /// Maximum number of records to return
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    50
}

/// Buy a currency for the authenticated user
#[utoipa::path(
    post,
    path = "/api/v1/trades/buy",
    request_body = TradeRequest,
    responses(
        (status = 200, description = "Trade settled successfully"),
        (status = 400, description = "Invalid quantity"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Currency not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "trade"
)]
pub async fn buy(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<TradeRequest>,
) -> Result<ApiResponse<Settlement>, ApiError> {
    let quantity = parse_trade_quantity(&request.quantity).map_err(ApiError::Common)?;

    let settlement = state
        .settlement
        .buy(user.id, request.currency_id, quantity)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(settlement))
}

/// Sell a currency for the authenticated user
#[utoipa::path(
    post,
    path = "/api/v1/trades/sell",
    request_body = TradeRequest,
    responses(
        (status = 200, description = "Trade settled successfully"),
        (status = 400, description = "Invalid quantity or insufficient funds"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Currency not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "trade"
)]
pub async fn sell(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<TradeRequest>,
) -> Result<ApiResponse<Settlement>, ApiError> {
    let quantity = parse_trade_quantity(&request.quantity).map_err(ApiError::Common)?;

    let settlement = state
        .settlement
        .sell(user.id, request.currency_id, quantity)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(settlement))
}

/// Recent orders for the authenticated user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum number of orders to return")
    ),
    responses(
        (status = 200, description = "Orders retrieved successfully"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    tag = "trade"
)]
pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<ApiListResponse<Order>, ApiError> {
    let orders = state
        .settlement
        .recent_orders(user.id, query.limit)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiListResponse::new(orders))
}

/// Recent transactions for the authenticated user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum number of transactions to return")
    ),
    responses(
        (status = 200, description = "Transactions retrieved successfully"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    tag = "trade"
)]
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<ApiListResponse<Transaction>, ApiError> {
    let transactions = state
        .settlement
        .recent_transactions(user.id, query.limit)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiListResponse::new(transactions))
}
