//! Currency API handlers
//!
//! Public market views: the currency list with latest quotes (the
//! dashboard), single-currency details, and price history.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use common::model::currency::Cryptocurrency;
use common::model::price::MarketPrice;
use price_service::CurrencyQuote;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::error::ApiError;
use crate::AppState;

/// Price history query parameters
#[derive(Debug, Deserialize, ToSchema)]
pub struct PriceHistoryQuery {
    /// Maximum number of observations to return
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// List all currencies with their latest quote
#[utoipa::path(
    get,
    path = "/api/v1/currencies",
    responses(
        (status = 200, description = "Currencies retrieved successfully"),
        (status = 500, description = "Internal server error")
    ),
    tag = "currency"
)]
pub async fn get_currencies(
    State(state): State<Arc<AppState>>,
) -> Result<ApiListResponse<CurrencyQuote>, ApiError> {
    let quotes = state
        .pricing
        .list_currency_quotes()
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiListResponse::new(quotes))
}

/// Get a currency by ID
#[utoipa::path(
    get,
    path = "/api/v1/currencies/{id}",
    params(
        ("id" = Uuid, Path, description = "Currency ID")
    ),
    responses(
        (status = 200, description = "Currency retrieved successfully"),
        (status = 404, description = "Currency not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "currency"
)]
pub async fn get_currency(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Cryptocurrency>, ApiError> {
    let currency = state
        .pricing
        .get_currency(id)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::NotFound(format!("Currency not found: {}", id)))?;

    Ok(ApiResponse::new(currency))
}

/// Price history for a currency, newest first
#[utoipa::path(
    get,
    path = "/api/v1/currencies/{id}/prices",
    params(
        ("id" = Uuid, Path, description = "Currency ID"),
        ("limit" = Option<usize>, Query, description = "Maximum number of observations to return")
    ),
    responses(
        (status = 200, description = "Price history retrieved successfully"),
        (status = 404, description = "Currency not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "currency"
)]
pub async fn get_price_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<PriceHistoryQuery>,
) -> Result<ApiListResponse<MarketPrice>, ApiError> {
    let history = state
        .pricing
        .price_history(id, query.limit)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiListResponse::new(history))
}
