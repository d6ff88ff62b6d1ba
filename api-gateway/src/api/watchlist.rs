//! Watchlist API handlers
//!
//! Bookmarked currencies for the authenticated user. Adding is idempotent;
//! removing an absent bookmark is a 404.

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use common::model::watchlist::WatchlistEntry;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// Watchlist removal result
#[derive(Debug, Serialize, ToSchema)]
pub struct WatchlistRemoval {
    /// The currency that was removed
    pub currency_id: Uuid,
    /// Always true; removal of an absent entry is a 404 instead
    pub removed: bool,
}

/// List the authenticated user's watchlist
#[utoipa::path(
    get,
    path = "/api/v1/watchlist",
    responses(
        (status = 200, description = "Watchlist retrieved successfully"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    ),
    tag = "watchlist"
)]
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<ApiListResponse<WatchlistEntry>, ApiError> {
    let entries = state
        .users
        .watchlist(user.id)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiListResponse::new(entries))
}

/// Bookmark a currency
#[utoipa::path(
    post,
    path = "/api/v1/watchlist/{currency_id}",
    params(
        ("currency_id" = Uuid, Path, description = "Currency to bookmark")
    ),
    responses(
        (status = 200, description = "Currency bookmarked (or already bookmarked)"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Currency not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "watchlist"
)]
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(currency_id): Path<Uuid>,
) -> Result<ApiResponse<WatchlistEntry>, ApiError> {
    let entry = state
        .users
        .add_to_watchlist(user.id, currency_id)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(entry))
}

/// Remove a bookmark
#[utoipa::path(
    delete,
    path = "/api/v1/watchlist/{currency_id}",
    params(
        ("currency_id" = Uuid, Path, description = "Currency to remove from the watchlist")
    ),
    responses(
        (status = 200, description = "Bookmark removed"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Currency was not on the watchlist"),
        (status = 500, description = "Internal server error")
    ),
    tag = "watchlist"
)]
pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(currency_id): Path<Uuid>,
) -> Result<ApiResponse<WatchlistRemoval>, ApiError> {
    state
        .users
        .remove_from_watchlist(user.id, currency_id)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(WatchlistRemoval {
        currency_id,
        removed: true,
    }))
}
