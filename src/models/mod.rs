//! Shared data models for the Loanee backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LendingError;

/// Crypto assets accepted as collateral
#[derive(
    Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[sqlx(type_name = "asset_symbol", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum AssetSymbol {
    Btc,
    Eth,
    Usdt,
}

impl AssetSymbol {
    /// Every supported asset, in preview order
    pub const ALL: [AssetSymbol; 3] = [AssetSymbol::Btc, AssetSymbol::Eth, AssetSymbol::Usdt];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetSymbol::Btc => "BTC",
            AssetSymbol::Eth => "ETH",
            AssetSymbol::Usdt => "USDT",
        }
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetSymbol {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BTC" => Ok(AssetSymbol::Btc),
            "ETH" => Ok(AssetSymbol::Eth),
            "USDT" => Ok(AssetSymbol::Usdt),
            other => Err(LendingError::InvalidInput(format!(
                "unsupported asset '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for AssetSymbol {
    type Error = LendingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Fiat currencies loans are denominated in
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[sqlx(type_name = "fiat_currency", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum FiatCurrency {
    #[default]
    Usd,
    Ngn,
}

impl FiatCurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            FiatCurrency::Usd => "USD",
            FiatCurrency::Ngn => "NGN",
        }
    }

    /// Lowercase code as price feeds expect it
    pub fn code_lower(&self) -> &'static str {
        match self {
            FiatCurrency::Usd => "usd",
            FiatCurrency::Ngn => "ngn",
        }
    }

    /// Normalise optional user input; an absent or blank currency means USD
    pub fn normalize(raw: Option<&str>) -> Result<Self, LendingError> {
        match raw {
            None => Ok(FiatCurrency::Usd),
            Some(s) => s.parse(),
        }
    }
}

impl fmt::Display for FiatCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FiatCurrency {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "" | "USD" => Ok(FiatCurrency::Usd),
            "NGN" => Ok(FiatCurrency::Ngn),
            other => Err(LendingError::InvalidInput(format!(
                "unsupported currency '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for FiatCurrency {
    type Error = LendingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Caller roles carried on each request
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

/// Generic API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
