//! API handlers for the Loanee backend

pub mod collateral;
pub mod health;
pub mod loan;
pub mod repayment;

pub use collateral::*;
pub use health::health_check;
pub use loan::*;
pub use repayment::*;
