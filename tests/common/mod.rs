//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use loanee_server::chain::{TransactionData, TransactionVerifier, Verdict, VerificationError};
use loanee_server::collateral::CollateralService;
use loanee_server::config::LoanConfig;
use loanee_server::db::MemoryStore;
use loanee_server::loan::{Loan, LoanRepository, LoanService, LoanStatus};
use loanee_server::models::{AssetSymbol, FiatCurrency};
use loanee_server::oracle::FixedPriceOracle;
use loanee_server::repayment::RepaymentService;

enum Script {
    Reject(String),
    Unreachable,
}

/// Verifier that accepts everything except the hashes it was told to refuse
#[derive(Default)]
pub struct ScriptedVerifier {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn reject(&self, tx_hash: &str, reason: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(tx_hash.to_string(), Script::Reject(reason.to_string()));
    }

    pub fn unreachable(&self, tx_hash: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(tx_hash.to_string(), Script::Unreachable);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionVerifier for ScriptedVerifier {
    async fn verify_transaction(
        &self,
        tx_hash: &str,
        _asset: AssetSymbol,
        expected_amount: Decimal,
    ) -> Result<Verdict, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.lock().unwrap().get(tx_hash) {
            Some(Script::Reject(reason)) => Ok(Verdict::invalid(reason.clone())),
            Some(Script::Unreachable) => {
                Err(VerificationError::Unreachable("connection refused".to_string()))
            }
            None => Ok(Verdict::Valid(TransactionData {
                hash: tx_hash.to_string(),
                from: "0xsender".to_string(),
                to: None,
                amount: expected_amount,
                confirmations: 20,
            })),
        }
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub oracle: Arc<FixedPriceOracle>,
    pub verifier: Arc<ScriptedVerifier>,
    pub collaterals: Arc<CollateralService>,
    pub loans: Arc<LoanService>,
    pub repayments: Arc<RepaymentService>,
}

/// BTC 20000, ETH 1000, USDT 1 with LTV 0.5 and no interest
pub fn test_config() -> LoanConfig {
    LoanConfig {
        default_ltv: dec!(0.5),
        default_interest_rate: Decimal::ZERO,
        ..LoanConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: LoanConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let oracle = Arc::new(FixedPriceOracle::new());
    oracle.set_price("BTC", dec!(20000));
    oracle.set_price("ETH", dec!(1000));
    oracle.set_price("USDT", dec!(1));
    let verifier = Arc::new(ScriptedVerifier::default());

    let loans = Arc::new(LoanService::new(
        store.clone(),
        store.clone(),
        config.clone(),
    ));
    let collaterals = Arc::new(
        CollateralService::new(store.clone(), oracle.clone(), verifier.clone(), config)
            .with_loan_origination(loans.clone()),
    );
    let repayments = Arc::new(RepaymentService::new(store.clone(), loans.clone()));

    Harness {
        store,
        oracle,
        verifier,
        collaterals,
        loans,
        repayments,
    }
}

/// An active loan written straight to the store
pub fn loan_fixture(
    user_id: Uuid,
    principal: Decimal,
    rate: Decimal,
    next_due: DateTime<Utc>,
    status: LoanStatus,
) -> Loan {
    let now = Utc::now();
    Loan {
        id: Uuid::new_v4(),
        user_id,
        collateral_id: Uuid::new_v4(),
        fiat_currency: FiatCurrency::Usd,
        amount_requested: principal,
        amount_approved: principal,
        principal_outstanding: principal,
        interest_rate: rate,
        duration_months: 12,
        disbursed_at: Some(now - Duration::days(30)),
        next_due_date: Some(next_due),
        total_repaid: Decimal::ZERO,
        penalty_accrued: Decimal::ZERO,
        last_payment_at: None,
        status,
        created_at: now - Duration::days(30),
        updated_at: now - Duration::days(30),
    }
}

pub async fn insert_loan(store: &MemoryStore, loan: &Loan) -> Loan {
    LoanRepository::create(store, loan).await.unwrap()
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
