//! Loan models
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::FiatCurrency;

/// Loan status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Active,
    Delinquent,
    Repaid,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Active => "active",
            LoanStatus::Delinquent => "delinquent",
            LoanStatus::Repaid => "repaid",
            LoanStatus::Defaulted => "defaulted",
        }
    }
}

/// Loan model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub collateral_id: Uuid,
    /// Currency of the originating collateral; repayments must match it
    pub fiat_currency: FiatCurrency,
    pub amount_requested: Decimal,
    pub amount_approved: Decimal,
    pub principal_outstanding: Decimal,
    /// Annualized, in percent
    pub interest_rate: Decimal,
    pub duration_months: i32,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub next_due_date: Option<DateTime<Utc>>,
    pub total_repaid: Decimal,
    pub penalty_accrued: Decimal,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Portions of one repayment applied to each bucket
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepaymentBreakdown {
    pub principal: Decimal,
    pub interest: Decimal,
    pub penalty: Decimal,
}

impl RepaymentBreakdown {
    pub fn total(&self) -> Decimal {
        self.principal + self.interest + self.penalty
    }

    pub fn is_zero(&self) -> bool {
        self.total().is_zero()
    }
}

/// Admin approval body; a missing or non-positive amount approves what was requested
#[derive(Debug, Default, Deserialize)]
pub struct ApproveLoanRequest {
    pub amount: Option<Decimal>,
}
