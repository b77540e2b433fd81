//! Loan engine: lifecycle, repayment waterfall and default detection

mod detector;
mod locks;
pub mod model;
pub mod repository;
mod service;
pub mod waterfall;

pub use detector::default_detector;
pub use locks::{LoanGuard, LoanLocks};
pub use model::*;
pub use repository::{LoanRepository, PgLoanRepository};
pub use service::LoanService;
pub use waterfall::REPAYMENT_EPSILON;
