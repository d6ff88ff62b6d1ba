//! API gateway for the exchange platform
//!
//! Maps HTTP requests onto the settlement, portfolio, user, and pricing
//! services, resolves session identity, and renders results as JSON.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ledger_service::{PortfolioService, SettlementService, UserService};
use price_service::PricingService;

use crate::api::{
    admin::{admin_login, admin_register, create_currency, list_users, record_price},
    auth::{login, logout, register},
    currency::{get_currencies, get_currency, get_price_history},
    portfolio::{get_portfolio, get_wallets},
    trade::{buy, get_orders, get_transactions, sell},
    watchlist::{add_to_watchlist, get_watchlist, remove_from_watchlist},
};
use crate::auth::SessionStore;

/// API documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth routes
        api::auth::register,
        api::auth::login,
        api::auth::logout,
        // Currency routes
        api::currency::get_currencies,
        api::currency::get_currency,
        api::currency::get_price_history,
        // Trade routes
        api::trade::buy,
        api::trade::sell,
        api::trade::get_orders,
        api::trade::get_transactions,
        // Portfolio routes
        api::portfolio::get_portfolio,
        api::portfolio::get_wallets,
        // Watchlist routes
        api::watchlist::get_watchlist,
        api::watchlist::add_to_watchlist,
        api::watchlist::remove_from_watchlist,
        // Admin routes
        api::admin::admin_register,
        api::admin::admin_login,
        api::admin::create_currency,
        api::admin::record_price,
        api::admin::list_users,
    ),
    components(
        schemas(
            // Auth API
            api::auth::RegisterRequest,
            api::auth::LoginRequest,
            api::auth::LoginResponse,
            api::auth::LogoutResponse,

            // Trade API
            api::trade::TradeRequest,
            api::trade::ListQuery,

            // Currency API
            api::currency::PriceHistoryQuery,

            // Watchlist API
            api::watchlist::WatchlistRemoval,

            // Admin API
            api::admin::AdminRegisterRequest,
            api::admin::AdminLoginRequest,
            api::admin::AdminLoginResponse,
            api::admin::CreateCurrencyRequest,
            api::admin::RecordPriceRequest,

            // Domain models
            common::model::user::User,
            common::model::user::AdminUser,
            common::model::currency::Cryptocurrency,
            common::model::price::MarketPrice,
            common::model::wallet::Wallet,
            common::model::trade::Order,
            common::model::trade::Transaction,
            common::model::trade::Side,
            common::model::trade::OrderStatus,
            common::model::trade::TransactionKind,
            common::model::watchlist::WatchlistEntry,
            ledger_service::Settlement,
            ledger_service::PortfolioValuation,
            ledger_service::PortfolioPosition,
            price_service::CurrencyQuote,

            // Response models
            api::response::ApiResponse<common::model::user::User>,
            api::response::ApiResponse<ledger_service::Settlement>,
            api::response::ApiResponse<ledger_service::PortfolioValuation>,
            api::response::ApiListResponse<price_service::CurrencyQuote>,
            api::response::ApiListResponse<common::model::trade::Order>,
            api::response::ApiListResponse<common::model::trade::Transaction>,
            api::response::ResponseMetadata
        )
    ),
    tags(
        (name = "auth", description = "User registration and session endpoints"),
        (name = "currency", description = "Currency and market price endpoints"),
        (name = "trade", description = "Buy/sell settlement and audit trail endpoints"),
        (name = "portfolio", description = "Wallet and portfolio valuation endpoints"),
        (name = "watchlist", description = "Watchlist endpoints"),
        (name = "admin", description = "Administration endpoints")
    ),
    info(
        title = "Coinbay Exchange API",
        version = "1.0.0",
        description = "API for the crypto exchange demo platform: authentication, market prices, trade settlement, portfolio valuation, and watchlists"
    )
)]
pub struct ApiDoc;

/// App state shared across handlers
pub struct AppState {
    /// Trade settlement service
    pub settlement: Arc<SettlementService>,
    /// Portfolio valuation service
    pub portfolio: Arc<PortfolioService>,
    /// User, admin, and watchlist service
    pub users: Arc<UserService>,
    /// Pricing service
    pub pricing: Arc<PricingService>,
    /// Session store for bearer tokens
    pub sessions: SessionStore,
}

/// Build the application router over the shared state
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Auth routes
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        // Currency routes
        .route("/currencies", get(get_currencies))
        .route("/currencies/:id", get(get_currency))
        .route("/currencies/:id/prices", get(get_price_history))
        // Trade routes
        .route("/trades/buy", post(buy))
        .route("/trades/sell", post(sell))
        .route("/orders", get(get_orders))
        .route("/transactions", get(get_transactions))
        // Portfolio routes
        .route("/portfolio", get(get_portfolio))
        .route("/wallets", get(get_wallets))
        // Watchlist routes
        .route("/watchlist", get(get_watchlist))
        .route(
            "/watchlist/:currency_id",
            post(add_to_watchlist).delete(remove_from_watchlist),
        )
        // Admin routes
        .route("/admin/register", post(admin_register))
        .route("/admin/login", post(admin_login))
        .route("/admin/currencies", post(create_currency))
        .route("/admin/currencies/:id/prices", post(record_price))
        .route("/admin/users", get(list_users));

    // Set up Swagger UI
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(swagger_ui)
        .layer(cors)
        .with_state(state)
}
