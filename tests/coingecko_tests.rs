//! CoinGecko adapter against a local stand-in server

mod common;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::serve;
use loanee_server::error::{ErrorKind, LendingError};
use loanee_server::models::FiatCurrency;
use loanee_server::oracle::{CoinGeckoOracle, OracleError, PriceOracle};

#[derive(Clone, Default)]
struct Seen {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    api_keys: Arc<Mutex<Vec<Option<String>>>>,
}

async fn simple_price(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    seen.api_keys.lock().unwrap().push(
        headers
            .get("x-cg-pro-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    seen.queries.lock().unwrap().push(query);

    Json(json!({
        "bitcoin": { "usd": 43250.5, "ngn": 65000000 },
        "ethereum": { "usd": 2300.25 },
        "tether": { "usd": 0 }
    }))
}

async fn start(seen: Seen) -> String {
    let router = Router::new()
        .route("/simple/price", get(simple_price))
        .with_state(seen);
    serve(router).await
}

#[tokio::test]
async fn test_prices_are_parsed_per_symbol() {
    let seen = Seen::default();
    let base = start(seen.clone()).await;
    let oracle = CoinGeckoOracle::new(base, None, Duration::ZERO).unwrap();

    let prices = oracle
        .get_prices(&["BTC", "eth", "USDT", "FOO"], FiatCurrency::Usd)
        .await
        .unwrap();

    assert_eq!(prices.get("BTC"), Some(&dec!(43250.5)));
    assert_eq!(prices.get("ETH"), Some(&dec!(2300.25)));
    // Zero quotes are discarded; unknown symbols never reach the server
    assert!(!prices.contains_key("USDT"));
    assert!(!prices.contains_key("FOO"));

    let queries = seen.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["ids"], "bitcoin,ethereum,tether");
    assert_eq!(queries[0]["vs_currencies"], "usd");
    assert_eq!(seen.api_keys.lock().unwrap()[0], None);
}

#[tokio::test]
async fn test_api_key_and_currency_are_forwarded() {
    let seen = Seen::default();
    let base = start(seen.clone()).await;
    let oracle =
        CoinGeckoOracle::new(format!("{}/", base), Some("secret".to_string()), Duration::ZERO)
            .unwrap();

    let price = oracle.get_price("BTC", FiatCurrency::Ngn).await.unwrap();
    assert_eq!(price, dec!(65000000));

    assert_eq!(seen.queries.lock().unwrap()[0]["vs_currencies"], "ngn");
    assert_eq!(
        seen.api_keys.lock().unwrap()[0].as_deref(),
        Some("secret")
    );
}

#[tokio::test]
async fn test_missing_currency_quote_yields_no_prices() {
    let base = start(Seen::default()).await;
    let oracle = CoinGeckoOracle::new(base, None, Duration::ZERO).unwrap();

    let err = oracle
        .get_prices(&["ETH"], FiatCurrency::Ngn)
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::NoPrices(_)));
}

#[tokio::test]
async fn test_upstream_error_status() {
    let router = Router::new().route(
        "/simple/price",
        get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let base = serve(router).await;
    let oracle = CoinGeckoOracle::new(base, None, Duration::ZERO).unwrap();

    let err = oracle
        .get_prices(&["BTC"], FiatCurrency::Usd)
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Upstream { status: 429 }));

    let lending: LendingError = err.into();
    assert_eq!(lending.kind(), ErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Bind and drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let oracle = CoinGeckoOracle::new(format!("http://{}", addr), None, Duration::ZERO).unwrap();
    let err = oracle
        .get_prices(&["BTC"], FiatCurrency::Usd)
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Transport(_)));
}
