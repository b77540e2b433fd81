//! Repayment recorder

pub mod model;
pub mod repository;
pub mod service;

pub use model::*;
pub use repository::{PaymentRepository, PgPaymentRepository};
pub use service::RepaymentService;
