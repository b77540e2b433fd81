//! On-chain transaction verification
//!
//! Collateral only becomes active once a [`TransactionVerifier`] confirms the deposit
//! transaction. The variant is chosen once at startup from configuration.

mod ethereum;
mod noop;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{BlockchainConfig, Environment, VerifierMode};
use crate::error::LendingError;
use crate::models::AssetSymbol;

pub use ethereum::EthereumVerifier;
pub use noop::NoopVerifier;

/// Maximum absolute difference between the on-chain and claimed amount
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Transfer details read from the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionData {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub amount: Decimal,
    pub confirmations: u64,
}

/// Outcome of a verification that reached the chain node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid(TransactionData),
    Invalid { reason: String },
}

impl Verdict {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Verdict::Invalid {
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }
}

/// Verifier failures that are not a verdict about the transaction itself
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("chain node unreachable: {0}")]
    Unreachable(String),

    #[error("chain node error: {0}")]
    Rpc(String),

    #[error("malformed chain node response: {0}")]
    Malformed(String),
}

impl From<VerificationError> for LendingError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Unreachable(msg) => LendingError::UpstreamUnavailable(msg),
            other => LendingError::VerificationFailed(other.to_string()),
        }
    }
}

#[async_trait]
pub trait TransactionVerifier: Send + Sync {
    /// Check that `tx_hash` moved `expected_amount` of `asset` with enough confirmations
    async fn verify_transaction(
        &self,
        tx_hash: &str,
        asset: AssetSymbol,
        expected_amount: Decimal,
    ) -> Result<Verdict, VerificationError>;
}

/// Build the configured verifier
pub fn build_verifier(
    config: &BlockchainConfig,
    environment: &Environment,
) -> Result<Arc<dyn TransactionVerifier>, VerificationError> {
    match config.verifier {
        VerifierMode::Noop => {
            if environment.is_production() {
                tracing::warn!("No-op transaction verifier enabled in production");
            } else {
                tracing::info!("Using no-op transaction verifier");
            }
            Ok(Arc::new(NoopVerifier))
        }
        VerifierMode::Ethereum => {
            tracing::info!(
                rpc_url = %config.eth_rpc_url,
                min_confirmations = config.min_confirmations,
                "Using Ethereum transaction verifier"
            );
            Ok(Arc::new(EthereumVerifier::new(
                config.eth_rpc_url.clone(),
                config.min_confirmations,
            )?))
        }
    }
}

/// Whether `actual` is within [`AMOUNT_TOLERANCE`] of `expected`
pub fn amount_matches(actual: Decimal, expected: Decimal) -> bool {
    (actual - expected).abs() <= AMOUNT_TOLERANCE
}
