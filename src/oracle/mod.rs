//! Price oracle for Loanee
//!
//! I'm keeping every pricing concern here: the `PriceOracle` capability trait, the
//! CoinGecko adapter, a fixed-quote variant for tests and local runs, and the
//! token bucket that spaces out upstream calls.

mod coingecko;
mod fixed;
mod model;
mod rate_limiter;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{PriceProvider, PricingConfig};
use crate::models::FiatCurrency;

pub use coingecko::{coin_id, CoinGeckoOracle};
pub use fixed::FixedPriceOracle;
pub use model::OracleError;
pub use rate_limiter::PriceRateLimiter;

/// Fiat price source for crypto asset symbols
///
/// Implementations skip symbols they cannot price and only fail the whole call when
/// none of the requested symbols resolve. Returned keys are upper-case symbols.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_prices(
        &self,
        symbols: &[&str],
        currency: FiatCurrency,
    ) -> Result<HashMap<String, Decimal>, OracleError>;

    async fn get_price(
        &self,
        symbol: &str,
        currency: FiatCurrency,
    ) -> Result<Decimal, OracleError> {
        let key = symbol.trim().to_uppercase();
        let prices = self.get_prices(&[key.as_str()], currency).await?;
        prices
            .get(&key)
            .copied()
            .ok_or(OracleError::UnknownSymbol(key))
    }
}

/// Build the configured price oracle
pub fn build_price_oracle(config: &PricingConfig) -> Result<Arc<dyn PriceOracle>, OracleError> {
    match config.provider {
        PriceProvider::CoinGecko => {
            tracing::info!(base_url = %config.coingecko_base_url, "Using CoinGecko price oracle");
            let oracle = CoinGeckoOracle::new(
                config.coingecko_base_url.clone(),
                config.coingecko_api_key.clone(),
                Duration::from_secs(config.min_interval_secs),
            )?;
            Ok(Arc::new(oracle))
        }
        PriceProvider::Fixed => {
            tracing::info!(
                symbols = config.fixed_prices.len(),
                "Using fixed price oracle"
            );
            Ok(Arc::new(FixedPriceOracle::with_prices(
                config.fixed_prices.clone(),
            )))
        }
    }
}
