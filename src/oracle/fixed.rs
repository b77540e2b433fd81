//! Fixed-quote price oracle
//!
//! Serves configured prices without any network access. Used by tests and by local
//! runs with `PRICE_PROVIDER=fixed`. Quotes are the same for every fiat currency.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::model::OracleError;
use super::PriceOracle;
use crate::models::FiatCurrency;

#[derive(Default)]
pub struct FixedPriceOracle {
    prices: RwLock<HashMap<String, Decimal>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl FixedPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(prices: HashMap<String, Decimal>) -> Self {
        let oracle = Self::new();
        for (symbol, price) in prices {
            oracle.set_price(&symbol, price);
        }
        oracle
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.insert(symbol.trim().to_uppercase(), price);
    }

    pub fn remove_price(&self, symbol: &str) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.remove(&symbol.trim().to_uppercase());
    }

    /// Simulate an upstream outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get_prices` calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn get_prices(
        &self,
        symbols: &[&str],
        _currency: FiatCurrency,
    ) -> Result<HashMap<String, Decimal>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable);
        }

        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());
        let mut found = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.trim().to_uppercase();
            match prices.get(&symbol) {
                Some(price) => {
                    found.insert(symbol, *price);
                }
                None => tracing::warn!(symbol = %symbol, "Unknown symbol, skipping"),
            }
        }

        if found.is_empty() {
            return Err(OracleError::NoPrices(symbols.join(",")));
        }
        Ok(found)
    }
}
