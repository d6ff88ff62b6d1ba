use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::runtime::Runtime;
use uuid::Uuid;

use common::decimal::{dec, Price};
use common::error::{Error, Result};
use common::model::currency::Cryptocurrency;
use common::model::price::{MarketPrice, PriceFeed};
use common::model::trade::{Side, TransactionKind};
use ledger_service::{
    InMemoryLedgerRepository, LedgerRepository, PortfolioService, PricePolicy, SettlementService,
    UserService,
};

// Helper function to run async tests
fn run_async<F>(test: F)
where
    F: FnOnce() -> futures::future::BoxFuture<'static, ()> + Send + 'static,
{
    // Create runtime
    let rt = Runtime::new().unwrap();

    // Run the test
    rt.block_on(async {
        test().await;
    });
}

/// Stub price feed backed by plain maps; `set_price` replaces the latest
/// observation so tests can move the market between calls
struct StubPriceFeed {
    currencies: DashMap<Uuid, Cryptocurrency>,
    prices: DashMap<Uuid, MarketPrice>,
}

impl StubPriceFeed {
    fn new() -> Self {
        Self {
            currencies: DashMap::new(),
            prices: DashMap::new(),
        }
    }

    fn add_currency(&self, name: &str, symbol: &str) -> Uuid {
        let currency = Cryptocurrency::new(name.to_string(), symbol.to_string(), None, None);
        let id = currency.id;
        self.currencies.insert(id, currency);
        id
    }

    fn set_price(&self, currency_id: Uuid, price: Price) {
        self.prices
            .insert(currency_id, MarketPrice::new(currency_id, price));
    }
}

#[async_trait]
impl PriceFeed for StubPriceFeed {
    async fn currency(&self, id: Uuid) -> Result<Option<Cryptocurrency>> {
        Ok(self.currencies.get(&id).map(|c| c.clone()))
    }

    async fn latest_price(&self, currency_id: Uuid) -> Result<Option<MarketPrice>> {
        Ok(self.prices.get(&currency_id).map(|p| p.clone()))
    }
}

struct Harness {
    repo: Arc<InMemoryLedgerRepository>,
    feed: Arc<StubPriceFeed>,
    settlement: Arc<SettlementService>,
    portfolio: PortfolioService,
    users: UserService,
}

fn harness_with_policy(policy: PricePolicy) -> Harness {
    let repo = Arc::new(InMemoryLedgerRepository::new());
    let feed = Arc::new(StubPriceFeed::new());
    let ledger: Arc<dyn LedgerRepository> = repo.clone();
    let prices: Arc<dyn PriceFeed> = feed.clone();

    Harness {
        settlement: Arc::new(SettlementService::with_policy(
            ledger.clone(),
            prices.clone(),
            policy,
        )),
        portfolio: PortfolioService::new(ledger.clone(), prices.clone()),
        users: UserService::new(ledger, prices),
        repo,
        feed,
    }
}

fn harness() -> Harness {
    harness_with_policy(PricePolicy::default())
}

async fn new_user(h: &Harness, email: &str) -> Uuid {
    h.users
        .register_user("Ada Lovelace", email, "phc-hash")
        .await
        .unwrap()
        .id
}

mod settlement_tests {
    use super::*;

    #[test]
    fn test_buy_creates_wallet_order_and_transaction() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "buyer@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                let settlement = h.settlement.buy(user, btc, dec!(0.5)).await.unwrap();

                assert_eq!(settlement.wallet_balance, dec!(0.5));
                assert_eq!(settlement.order.side, Side::Buy);
                assert_eq!(settlement.order.quantity, dec!(0.5));
                assert_eq!(settlement.order.unit_price, dec!(30000.00));
                assert_eq!(settlement.transaction.order_id, settlement.order.id);
                assert_eq!(settlement.transaction.amount, dec!(15000.00));
                assert_eq!(settlement.transaction.kind, TransactionKind::Buy);

                let wallet = h.repo.get_wallet(user, btc).await.unwrap().unwrap();
                assert_eq!(wallet.balance, dec!(0.5));

                assert_eq!(h.settlement.recent_orders(user, 10).await.unwrap().len(), 1);
                assert_eq!(
                    h.settlement.recent_transactions(user, 10).await.unwrap().len(),
                    1
                );
            })
        });
    }

    #[test]
    fn test_repeated_buys_accumulate() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "stacker@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                h.settlement.buy(user, btc, dec!(0.5)).await.unwrap();
                let settlement = h.settlement.buy(user, btc, dec!(0.25)).await.unwrap();

                assert_eq!(settlement.wallet_balance, dec!(0.75));
                assert_eq!(h.settlement.recent_orders(user, 10).await.unwrap().len(), 2);
            })
        });
    }

    #[test]
    fn test_buy_uses_fallback_price_when_market_is_empty() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "early@example.com").await;
                let newcoin = h.feed.add_currency("Newcoin", "NEW");

                let settlement = h.settlement.buy(user, newcoin, dec!(2)).await.unwrap();

                assert_eq!(settlement.order.unit_price, dec!(100.00));
                assert_eq!(settlement.transaction.amount, dec!(200.00));
            })
        });
    }

    #[test]
    fn test_reject_policy_refuses_unpriced_currency() {
        run_async(|| {
            Box::pin(async move {
                let h = harness_with_policy(PricePolicy::Reject);
                let user = new_user(&h, "strict@example.com").await;
                let newcoin = h.feed.add_currency("Newcoin", "NEW");

                let result = h.settlement.buy(user, newcoin, dec!(2)).await;

                match result {
                    Err(Error::NoPriceAvailable(_)) => (),
                    other => panic!("Expected NoPriceAvailable, got {:?}", other),
                }

                // Nothing was written
                assert!(h.repo.get_wallet(user, newcoin).await.unwrap().is_none());
                assert!(h.settlement.recent_orders(user, 10).await.unwrap().is_empty());
            })
        });
    }

    #[test]
    fn test_quantity_validation() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "picky@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                for bad in [dec!(0), dec!(-1), dec!(0.001)] {
                    match h.settlement.buy(user, btc, bad).await {
                        Err(Error::Validation(_)) => (),
                        other => panic!("Expected Validation for {}, got {:?}", bad, other),
                    }
                }

                assert!(h.settlement.recent_orders(user, 10).await.unwrap().is_empty());
            })
        });
    }

    #[test]
    fn test_unknown_currency_and_user() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "lost@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                match h.settlement.buy(user, Uuid::new_v4(), dec!(1)).await {
                    Err(Error::CurrencyNotFound(_)) => (),
                    other => panic!("Expected CurrencyNotFound, got {:?}", other),
                }

                match h.settlement.buy(Uuid::new_v4(), btc, dec!(1)).await {
                    Err(Error::UserNotFound(_)) => (),
                    other => panic!("Expected UserNotFound, got {:?}", other),
                }
            })
        });
    }

    #[test]
    fn test_sell_debits_wallet() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "seller@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                h.settlement.buy(user, btc, dec!(0.5)).await.unwrap();
                let settlement = h.settlement.sell(user, btc, dec!(0.2)).await.unwrap();

                assert_eq!(settlement.wallet_balance, dec!(0.3));
                assert_eq!(settlement.order.side, Side::Sell);
                assert_eq!(settlement.transaction.amount, dec!(6000.00));
                assert_eq!(settlement.transaction.kind, TransactionKind::Sell);

                let wallet = h.repo.get_wallet(user, btc).await.unwrap().unwrap();
                assert_eq!(wallet.balance, dec!(0.3));
                assert_eq!(h.settlement.recent_orders(user, 10).await.unwrap().len(), 2);
            })
        });
    }

    #[test]
    fn test_sell_insufficient_funds_leaves_no_side_effects() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "overdrawn@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                h.settlement.buy(user, btc, dec!(0.5)).await.unwrap();

                // Two identical failing sells: same error, same (absent)
                // side effects both times
                for _ in 0..2 {
                    match h.settlement.sell(user, btc, dec!(0.6)).await {
                        Err(Error::InsufficientFunds(_)) => (),
                        other => panic!("Expected InsufficientFunds, got {:?}", other),
                    }

                    let wallet = h.repo.get_wallet(user, btc).await.unwrap().unwrap();
                    assert_eq!(wallet.balance, dec!(0.5));
                    assert_eq!(h.settlement.recent_orders(user, 10).await.unwrap().len(), 1);
                    assert_eq!(
                        h.settlement.recent_transactions(user, 10).await.unwrap().len(),
                        1
                    );
                }
            })
        });
    }

    #[test]
    fn test_sell_without_wallet() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "empty@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                match h.settlement.sell(user, btc, dec!(0.1)).await {
                    Err(Error::InsufficientFunds(_)) => (),
                    other => panic!("Expected InsufficientFunds, got {:?}", other),
                }

                assert!(h.repo.get_wallet(user, btc).await.unwrap().is_none());
                assert!(h.settlement.recent_orders(user, 10).await.unwrap().is_empty());
            })
        });
    }

    #[test]
    fn test_amount_uses_bankers_rounding() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "rounder@example.com").await;
                let coin = h.feed.add_currency("Roundcoin", "RND");
                h.feed.set_price(coin, dec!(100.10));

                // 0.15 * 100.10 = 15.015 -> midpoint rounds to even cent
                let up = h.settlement.buy(user, coin, dec!(0.15)).await.unwrap();
                assert_eq!(up.transaction.amount, dec!(15.02));

                // 0.25 * 100.10 = 25.025 -> midpoint rounds to even cent
                let down = h.settlement.buy(user, coin, dec!(0.25)).await.unwrap();
                assert_eq!(down.transaction.amount, dec!(25.02));
            })
        });
    }

    #[test]
    fn test_concurrent_sells_never_overdraw() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "racer@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                h.settlement.buy(user, btc, dec!(1.00)).await.unwrap();

                // Every seller asks for the entire balance at once
                let sells = (0..4).map(|_| {
                    let settlement = h.settlement.clone();
                    async move { settlement.sell(user, btc, dec!(1.00)).await }
                });
                let results = futures::future::join_all(sells).await;

                let successes = results.iter().filter(|r| r.is_ok()).count();
                let refusals = results
                    .iter()
                    .filter(|r| matches!(r, Err(Error::InsufficientFunds(_))))
                    .count();

                assert_eq!(successes, 1);
                assert_eq!(refusals, 3);

                let wallet = h.repo.get_wallet(user, btc).await.unwrap().unwrap();
                assert_eq!(wallet.balance, dec!(0));
            })
        });
    }

    #[test]
    fn test_repricing_never_rewrites_history() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "historian@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                h.settlement.buy(user, btc, dec!(0.5)).await.unwrap();

                h.feed.set_price(btc, dec!(40000.00));

                // The stored transaction keeps the execution-time amount
                let transactions = h.settlement.recent_transactions(user, 10).await.unwrap();
                assert_eq!(transactions[0].amount, dec!(15000.00));

                // A new trade settles at the new price
                let settlement = h.settlement.buy(user, btc, dec!(0.5)).await.unwrap();
                assert_eq!(settlement.transaction.amount, dec!(20000.00));
            })
        });
    }
}

mod valuation_tests {
    use super::*;

    #[test]
    fn test_portfolio_totals_over_holdings() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "holder@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                let eth = h.feed.add_currency("Ethereum", "ETH");
                h.feed.set_price(btc, dec!(30000.00));
                h.feed.set_price(eth, dec!(2000.00));

                h.settlement.buy(user, btc, dec!(0.5)).await.unwrap();
                h.settlement.buy(user, eth, dec!(3)).await.unwrap();

                let valuation = h.portfolio.value_portfolio(user).await.unwrap();

                assert_eq!(valuation.positions.len(), 2);
                // Ordered by symbol: BTC before ETH
                assert_eq!(valuation.positions[0].symbol, "BTC");
                assert_eq!(valuation.positions[0].value, dec!(15000.00));
                assert_eq!(valuation.positions[1].symbol, "ETH");
                assert_eq!(valuation.positions[1].value, dec!(6000.00));
                assert_eq!(valuation.total_value, dec!(21000.00));
            })
        });
    }

    #[test]
    fn test_unpriced_holding_is_zero_valued_not_dropped() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "pioneer@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                let newcoin = h.feed.add_currency("Newcoin", "NEW");
                h.feed.set_price(btc, dec!(30000.00));

                h.settlement.buy(user, btc, dec!(1)).await.unwrap();
                // Settles at the fallback price, but the market itself
                // still has no observation for NEW
                h.settlement.buy(user, newcoin, dec!(5)).await.unwrap();

                let valuation = h.portfolio.value_portfolio(user).await.unwrap();

                assert_eq!(valuation.positions.len(), 2);
                let new_position = valuation
                    .positions
                    .iter()
                    .find(|p| p.symbol == "NEW")
                    .unwrap();
                assert_eq!(new_position.balance, dec!(5));
                assert_eq!(new_position.unit_price, None);
                assert_eq!(new_position.value, dec!(0));
                assert_eq!(valuation.total_value, dec!(30000.00));
            })
        });
    }

    #[test]
    fn test_valuation_follows_latest_price() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "watcher@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");
                h.feed.set_price(btc, dec!(30000.00));

                h.settlement.buy(user, btc, dec!(2)).await.unwrap();

                let before = h.portfolio.value_portfolio(user).await.unwrap();
                assert_eq!(before.total_value, dec!(60000.00));

                h.feed.set_price(btc, dec!(35000.00));

                let after = h.portfolio.value_portfolio(user).await.unwrap();
                assert_eq!(after.total_value, dec!(70000.00));
            })
        });
    }

    #[test]
    fn test_empty_portfolio() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "fresh@example.com").await;

                let valuation = h.portfolio.value_portfolio(user).await.unwrap();
                assert!(valuation.positions.is_empty());
                assert_eq!(valuation.total_value, dec!(0));

                match h.portfolio.value_portfolio(Uuid::new_v4()).await {
                    Err(Error::UserNotFound(_)) => (),
                    other => panic!("Expected UserNotFound, got {:?}", other),
                }
            })
        });
    }
}

mod user_tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();

                let user = h
                    .users
                    .register_user("Ada Lovelace", "Ada@Example.com", "phc-hash")
                    .await
                    .unwrap();

                // Emails are normalized to lowercase
                assert_eq!(user.email, "ada@example.com");

                let found = h
                    .users
                    .get_user_by_email("ada@example.COM")
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(found.id, user.id);

                match h
                    .users
                    .register_user("Imposter", "ada@example.com", "other-hash")
                    .await
                {
                    Err(Error::Validation(_)) => (),
                    other => panic!("Expected Validation, got {:?}", other),
                }
            })
        });
    }

    #[test]
    fn test_admin_accounts() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();

                let admin = h.users.create_admin("root", "phc-hash").await.unwrap();

                let found = h
                    .users
                    .get_admin_by_username("root")
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(found.id, admin.id);

                match h.users.create_admin("root", "other-hash").await {
                    Err(Error::Validation(_)) => (),
                    other => panic!("Expected Validation, got {:?}", other),
                }
            })
        });
    }

    #[test]
    fn test_watchlist_round_trip() {
        run_async(|| {
            Box::pin(async move {
                let h = harness();
                let user = new_user(&h, "curator@example.com").await;
                let btc = h.feed.add_currency("Bitcoin", "BTC");

                let entry = h.users.add_to_watchlist(user, btc).await.unwrap();

                // Re-adding is idempotent: same entry comes back
                let again = h.users.add_to_watchlist(user, btc).await.unwrap();
                assert_eq!(again.id, entry.id);
                assert_eq!(h.users.watchlist(user).await.unwrap().len(), 1);

                h.users.remove_from_watchlist(user, btc).await.unwrap();
                assert!(h.users.watchlist(user).await.unwrap().is_empty());

                match h.users.remove_from_watchlist(user, btc).await {
                    Err(Error::WatchlistEntryNotFound(_)) => (),
                    other => panic!("Expected WatchlistEntryNotFound, got {:?}", other),
                }

                match h.users.add_to_watchlist(user, Uuid::new_v4()).await {
                    Err(Error::CurrencyNotFound(_)) => (),
                    other => panic!("Expected CurrencyNotFound, got {:?}", other),
                }
            })
        });
    }
}
