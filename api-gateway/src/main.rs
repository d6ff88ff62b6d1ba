//! API gateway binary for the exchange platform

use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use dotenv::dotenv;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

use api_gateway::auth::SessionStore;
use api_gateway::config::AppConfig;
use api_gateway::{router, AppState};
use ledger_service::{
    InMemoryLedgerRepository, LedgerRepository, PortfolioService, PostgresLedgerRepository,
    PricePolicy, SettlementService, UserService,
};
use price_service::{
    InMemoryPriceRepository, PostgresPriceRepository, PriceRepository, PricingService,
};

/// Exchange API server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Listening address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging with debug level when DEBUG=1 env var is set
    let env = std::env::var("DEBUG").unwrap_or_else(|_| "0".to_string());
    let log_level = if env == "1" { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .parse("tower_http=debug,api_gateway=debug")
        .unwrap();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    debug!("Debug logging enabled");

    // Initialize repositories: PostgreSQL when a database URL is
    // configured, in-memory stores otherwise
    let config = AppConfig::new();
    let (ledger_repo, price_repo): (Arc<dyn LedgerRepository>, Arc<dyn PriceRepository>) =
        match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_pool_size)
                    .connect(url)
                    .await?;

                common::db::run_migrations(&pool).await?;
                info!("Connected to PostgreSQL and applied migrations");

                (
                    Arc::new(PostgresLedgerRepository::new(pool.clone())),
                    Arc::new(PostgresPriceRepository::new(pool)),
                )
            }
            None => {
                info!("No DATABASE_URL set, using in-memory stores");
                (
                    Arc::new(InMemoryLedgerRepository::new()),
                    Arc::new(InMemoryPriceRepository::new()),
                )
            }
        };

    // Initialize services
    let pricing = Arc::new(PricingService::new(price_repo));
    let price_feed: Arc<dyn common::model::price::PriceFeed> = pricing.clone();

    let policy = if config.reject_unpriced {
        PricePolicy::Reject
    } else {
        PricePolicy::default()
    };

    let settlement = Arc::new(SettlementService::with_policy(
        ledger_repo.clone(),
        price_feed.clone(),
        policy,
    ));
    let portfolio = Arc::new(PortfolioService::new(
        ledger_repo.clone(),
        price_feed.clone(),
    ));
    let users = Arc::new(UserService::new(ledger_repo, price_feed));

    // Seed demo market data for fresh in-memory runs
    if config.database_url.is_none() && config.seed_demo_data {
        seed_demo_market(&pricing).await?;
    }

    // Create app state
    let state = Arc::new(AppState {
        settlement,
        portfolio,
        users,
        pricing,
        sessions: SessionStore::new(),
    });

    let app = router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(log_level))
            .on_request(DefaultOnRequest::new().level(log_level))
            .on_response(DefaultOnResponse::new().level(log_level)),
    );

    // Start the server
    let addr: std::net::SocketAddr = args.addr.parse().expect("Invalid address");
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    // Run until interrupt signal
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Seed a pair of demo currencies with starting prices
async fn seed_demo_market(pricing: &PricingService) -> common::error::Result<()> {
    let btc = pricing
        .create_currency(
            "Bitcoin",
            "BTC",
            Some("UTXO".to_string()),
            NaiveDate::from_ymd_opt(2009, 1, 3),
        )
        .await?;
    pricing.record_price(btc.id, dec!(67421.55)).await?;

    let eth = pricing
        .create_currency(
            "Ethereum",
            "ETH",
            Some("EVM".to_string()),
            NaiveDate::from_ymd_opt(2015, 7, 30),
        )
        .await?;
    pricing.record_price(eth.id, dec!(3250.10)).await?;

    info!("Seeded demo market data (BTC, ETH)");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
