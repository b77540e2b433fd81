use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{AssetSymbol, FiatCurrency};

/// Collateral lifecycle
///
/// `preview` is never persisted. `released` and `liquidated` are terminal.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "collateral_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CollateralStatus {
    Preview,
    Pending,
    Active,
    ReleaseRequested,
    Released,
    Liquidated,
}

impl CollateralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollateralStatus::Preview => "preview",
            CollateralStatus::Pending => "pending",
            CollateralStatus::Active => "active",
            CollateralStatus::ReleaseRequested => "release_requested",
            CollateralStatus::Released => "released",
            CollateralStatus::Liquidated => "liquidated",
        }
    }
}

/// A quantity of crypto pledged against a fiat loan
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Collateral {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Loan auto-originated from this collateral, when origination succeeded
    pub loan_request_id: Option<Uuid>,
    pub asset_symbol: AssetSymbol,
    pub asset_amount: Decimal,
    /// Fiat value of `asset_amount` when priced
    pub asset_value: Decimal,
    /// `fiat_amount / ltv`
    pub required_value: Decimal,
    pub fiat_currency: FiatCurrency,
    pub fiat_amount: Decimal,
    pub ltv: Decimal,
    pub status: CollateralStatus,
    pub tx_hash: Option<String>,
    pub wallet_address: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub release_requested_at: Option<DateTime<Utc>>,
    pub release_resolved_at: Option<DateTime<Utc>>,
    pub release_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-asset requirement for a prospective loan
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CollateralQuote {
    pub asset_symbol: AssetSymbol,
    pub price: Decimal,
    pub fiat_currency: FiatCurrency,
    pub ltv: Decimal,
    pub required_value: Decimal,
    pub required_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub loan_amount: Decimal,
    pub fiat: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCollateralRequest {
    pub loan_amount: Decimal,
    pub fiat_currency: Option<String>,
    pub asset_symbol: AssetSymbol,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LockCollateralRequest {
    pub asset_symbol: AssetSymbol,
    #[validate(length(min = 1, max = 128))]
    pub tx_hash: String,
    pub amount: Decimal,
    #[validate(length(max = 128))]
    pub wallet_address: Option<String>,
    pub fiat_currency: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCollateralRequest {
    #[validate(length(min = 1, max = 128))]
    pub tx_hash: String,
    #[validate(length(max = 128))]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectReleaseRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}
