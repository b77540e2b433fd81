//! CoinGecko `/simple/price` adapter

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

use super::model::{parse_price, OracleError, SimplePriceResponse};
use super::rate_limiter::PriceRateLimiter;
use super::PriceOracle;
use crate::models::FiatCurrency;

/// CoinGecko coin id for a ticker symbol
pub fn coin_id(symbol: &str) -> Option<&'static str> {
    let id = match symbol.to_uppercase().as_str() {
        "BTC" => "bitcoin",
        "ETH" => "ethereum",
        "USDT" => "tether",
        "USDC" => "usd-coin",
        "BNB" => "binancecoin",
        "XRP" => "ripple",
        "ADA" => "cardano",
        "DOGE" => "dogecoin",
        "SOL" => "solana",
        "TRX" => "tron",
        "MATIC" => "matic-network",
        "DOT" => "polkadot",
        "AVAX" => "avalanche-2",
        "LINK" => "chainlink",
        "SHIB" => "shiba-inu",
        _ => return None,
    };
    Some(id)
}

/// Price oracle backed by the CoinGecko REST API
pub struct CoinGeckoOracle {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    limiter: PriceRateLimiter,
}

impl CoinGeckoOracle {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        min_interval: Duration,
    ) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            limiter: PriceRateLimiter::new(min_interval),
        })
    }

    async fn fetch(
        &self,
        ids: &[&str],
        currency: &str,
    ) -> Result<SimplePriceResponse, OracleError> {
        self.limiter.acquire().await;

        let url = format!("{}/simple/price", self.base_url);
        let ids = ids.join(",");
        tracing::debug!(%url, ids = %ids, currency, "Fetching prices");

        let mut request = self
            .client
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", currency)]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Upstream {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<SimplePriceResponse>().await?)
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn get_prices(
        &self,
        symbols: &[&str],
        currency: FiatCurrency,
    ) -> Result<HashMap<String, Decimal>, OracleError> {
        // symbol -> coin id for everything we know how to price
        let mut wanted: Vec<(String, &'static str)> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.trim().to_uppercase();
            match coin_id(&symbol) {
                Some(id) => wanted.push((symbol, id)),
                None => tracing::warn!(symbol = %symbol, "Unknown symbol, skipping"),
            }
        }

        if wanted.is_empty() {
            return Err(OracleError::NoPrices(symbols.join(",")));
        }

        let ids: Vec<&str> = wanted.iter().map(|(_, id)| *id).collect();
        let vs = currency.code_lower();
        let body = self.fetch(&ids, vs).await?;

        let mut prices = HashMap::with_capacity(wanted.len());
        for (symbol, id) in wanted {
            let Some(raw) = body.get(id).and_then(|quotes| quotes.get(vs)) else {
                tracing::warn!(symbol = %symbol, coin_id = id, currency = vs, "No quote returned");
                continue;
            };
            match parse_price(&symbol, raw) {
                Ok(price) => {
                    prices.insert(symbol, price);
                }
                Err(e) => tracing::warn!(symbol = %symbol, error = %e, "Discarding quote"),
            }
        }

        if prices.is_empty() {
            return Err(OracleError::NoPrices(symbols.join(",")));
        }

        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_id_lookup() {
        assert_eq!(coin_id("btc"), Some("bitcoin"));
        assert_eq!(coin_id("USDT"), Some("tether"));
        assert_eq!(coin_id("AVAX"), Some("avalanche-2"));
        assert_eq!(coin_id("NOPE"), None);
    }

    #[tokio::test]
    async fn test_unknown_symbols_only_fails_without_request() {
        // Port 9 is discard; the call must fail before any request is attempted.
        let oracle =
            CoinGeckoOracle::new("http://127.0.0.1:9".to_string(), None, Duration::ZERO).unwrap();

        let err = oracle
            .get_prices(&["FOO", "BAR"], FiatCurrency::Usd)
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::NoPrices(_)));
    }
}
