use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::runtime::Runtime;
use uuid::Uuid;

use common::decimal::dec;
use common::error::Error;
use common::model::price::{MarketPrice, PriceFeed};
use price_service::{InMemoryPriceRepository, PriceRepository, PricingService};

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

fn service() -> (PricingService, Arc<InMemoryPriceRepository>) {
    let repo = Arc::new(InMemoryPriceRepository::new());
    (PricingService::new(repo.clone()), repo)
}

#[test]
fn test_create_currency() {
    run_async(|| {
        Box::pin(async move {
            let (service, _repo) = service();

            let btc = service
                .create_currency("Bitcoin", "btc", Some("UTXO".to_string()), None)
                .await
                .unwrap();

            // Symbols are normalized to uppercase
            assert_eq!(btc.symbol, "BTC");

            let found = service.get_currency(btc.id).await.unwrap().unwrap();
            assert_eq!(found.name, "Bitcoin");

            // Duplicate symbols are refused, regardless of case
            match service.create_currency("Bitcoin Clone", "BTC", None, None).await {
                Err(Error::Validation(_)) => (),
                other => panic!("Expected Validation, got {:?}", other),
            }

            match service.create_currency("", "XYZ", None, None).await {
                Err(Error::Validation(_)) => (),
                other => panic!("Expected Validation, got {:?}", other),
            }
        })
    });
}

#[test]
fn test_list_currencies_ordered_by_name() {
    run_async(|| {
        Box::pin(async move {
            let (service, _repo) = service();

            service.create_currency("Ethereum", "ETH", None, None).await.unwrap();
            service.create_currency("Bitcoin", "BTC", None, None).await.unwrap();
            service.create_currency("Monero", "XMR", None, None).await.unwrap();

            let names: Vec<String> = service
                .list_currencies()
                .await
                .unwrap()
                .into_iter()
                .map(|c| c.name)
                .collect();

            assert_eq!(names, vec!["Bitcoin", "Ethereum", "Monero"]);
        })
    });
}

#[test]
fn test_record_and_resolve_latest_price() {
    run_async(|| {
        Box::pin(async move {
            let (service, _repo) = service();
            let btc = service.create_currency("Bitcoin", "BTC", None, None).await.unwrap();

            service.record_price(btc.id, dec!(30000.00)).await.unwrap();
            service.record_price(btc.id, dec!(31000.00)).await.unwrap();

            let latest = service.latest_price(btc.id).await.unwrap().unwrap();
            assert_eq!(latest.price, dec!(31000.00));
        })
    });
}

#[test]
fn test_record_price_validation() {
    run_async(|| {
        Box::pin(async move {
            let (service, _repo) = service();
            let btc = service.create_currency("Bitcoin", "BTC", None, None).await.unwrap();

            for bad in [dec!(0), dec!(-5), dec!(10.001)] {
                match service.record_price(btc.id, bad).await {
                    Err(Error::Validation(_)) => (),
                    other => panic!("Expected Validation for {}, got {:?}", bad, other),
                }
            }

            match service.record_price(Uuid::new_v4(), dec!(10.00)).await {
                Err(Error::CurrencyNotFound(_)) => (),
                other => panic!("Expected CurrencyNotFound, got {:?}", other),
            }

            assert!(service.latest_price(btc.id).await.unwrap().is_none());
        })
    });
}

#[test]
fn test_latest_price_is_max_timestamp_not_insertion_order() {
    run_async(|| {
        Box::pin(async move {
            let (service, repo) = service();
            let btc = service.create_currency("Bitcoin", "BTC", None, None).await.unwrap();

            // A backdated observation arriving after a newer one must not
            // become the latest price
            repo.record_price(MarketPrice::new(btc.id, dec!(31000.00)))
                .await
                .unwrap();

            let backdated = MarketPrice {
                id: Uuid::new_v4(),
                currency_id: btc.id,
                price: dec!(29000.00),
                recorded_at: Utc::now() - Duration::hours(1),
            };
            repo.record_price(backdated).await.unwrap();

            let latest = service.latest_price(btc.id).await.unwrap().unwrap();
            assert_eq!(latest.price, dec!(31000.00));
        })
    });
}

#[test]
fn test_price_history_newest_first() {
    run_async(|| {
        Box::pin(async move {
            let (service, repo) = service();
            let btc = service.create_currency("Bitcoin", "BTC", None, None).await.unwrap();

            let base = Utc::now();
            for (offset, price) in [(3, dec!(100.00)), (2, dec!(110.00)), (1, dec!(120.00))] {
                repo.record_price(MarketPrice {
                    id: Uuid::new_v4(),
                    currency_id: btc.id,
                    price,
                    recorded_at: base - Duration::minutes(offset),
                })
                .await
                .unwrap();
            }

            let history = service.price_history(btc.id, 2).await.unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history[0].price, dec!(120.00));
            assert_eq!(history[1].price, dec!(110.00));

            match service.price_history(Uuid::new_v4(), 10).await {
                Err(Error::CurrencyNotFound(_)) => (),
                other => panic!("Expected CurrencyNotFound, got {:?}", other),
            }
        })
    });
}

#[test]
fn test_currency_quotes_include_unpriced_currencies() {
    run_async(|| {
        Box::pin(async move {
            let (service, _repo) = service();

            let btc = service.create_currency("Bitcoin", "BTC", None, None).await.unwrap();
            service.create_currency("Newcoin", "NEW", None, None).await.unwrap();
            service.record_price(btc.id, dec!(30000.00)).await.unwrap();

            let quotes = service.list_currency_quotes().await.unwrap();
            assert_eq!(quotes.len(), 2);

            let btc_quote = quotes.iter().find(|q| q.currency.symbol == "BTC").unwrap();
            assert_eq!(btc_quote.latest_price, Some(dec!(30000.00)));
            assert!(btc_quote.as_of.is_some());

            let new_quote = quotes.iter().find(|q| q.currency.symbol == "NEW").unwrap();
            assert_eq!(new_quote.latest_price, None);
            assert_eq!(new_quote.as_of, None);
        })
    });
}

#[test]
fn test_price_feed_seam() {
    run_async(|| {
        Box::pin(async move {
            let (service, _repo) = service();
            let btc = service.create_currency("Bitcoin", "BTC", None, None).await.unwrap();
            service.record_price(btc.id, dec!(30000.00)).await.unwrap();

            let feed: &dyn PriceFeed = &service;

            let currency = feed.currency(btc.id).await.unwrap().unwrap();
            assert_eq!(currency.symbol, "BTC");

            let latest = feed.latest_price(btc.id).await.unwrap().unwrap();
            assert_eq!(latest.price, dec!(30000.00));

            assert!(feed.currency(Uuid::new_v4()).await.unwrap().is_none());
            assert!(feed.latest_price(Uuid::new_v4()).await.unwrap().is_none());
        })
    });
}
