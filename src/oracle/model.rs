//! Oracle errors and upstream payload shapes

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::error::LendingError;

/// Price oracle errors
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("no price available for {0}")]
    UnknownSymbol(String),

    #[error("none of the requested symbols could be priced: {0}")]
    NoPrices(String),

    #[error("price request failed: {0}")]
    Transport(String),

    #[error("price provider returned HTTP {status}")]
    Upstream { status: u16 },

    #[error("invalid price for {symbol}: {reason}")]
    InvalidPrice { symbol: String, reason: String },

    #[error("price feed unavailable")]
    Unavailable,
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Transport(err.to_string())
    }
}

impl From<OracleError> for LendingError {
    fn from(err: OracleError) -> Self {
        LendingError::UpstreamUnavailable(err.to_string())
    }
}

/// `/simple/price` body: coin id -> (vs currency -> price)
pub(crate) type SimplePriceResponse = HashMap<String, HashMap<String, serde_json::Number>>;

/// Convert a JSON number into a positive decimal price
pub(crate) fn parse_price(symbol: &str, raw: &serde_json::Number) -> Result<Decimal, OracleError> {
    let text = raw.to_string();
    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| OracleError::InvalidPrice {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;

    if price <= Decimal::ZERO {
        return Err(OracleError::InvalidPrice {
            symbol: symbol.to_string(),
            reason: format!("non-positive price {}", price),
        });
    }

    Ok(price)
}
