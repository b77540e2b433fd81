//! Loanee Backend Library
//!
//! Crypto-collateralized fiat lending: collateral ledger, loan engine and repayments,
//! with the price oracle and on-chain verifier they depend on.

pub mod chain;
pub mod collateral;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod middleware;
pub mod models;
pub mod oracle;
pub mod repayment;
pub mod routes;
pub mod state;
