use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::loan::Loan;
use crate::models::FiatCurrency;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Immutable repayment ledger row
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub user_id: Uuid,
    /// Full amount received, including any unallocated overpayment
    pub amount: Decimal,
    pub currency: FiatCurrency,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub principal_paid: Decimal,
    pub interest_paid: Decimal,
    pub penalty_paid: Decimal,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RepaymentRequest {
    pub amount: Decimal,
    pub currency: Option<String>,
    #[validate(length(max = 64))]
    pub method: Option<String>,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
}

/// A repayment after currency normalisation
#[derive(Debug, Clone)]
pub struct RepaymentInput {
    pub amount: Decimal,
    pub currency: FiatCurrency,
    pub method: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct RepaymentResult {
    pub loan: Loan,
    pub payment: Payment,
    pub remaining_principal: Decimal,
}
