//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::collateral::CollateralService;
use crate::loan::LoanService;
use crate::repayment::RepaymentService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub collateral_service: Arc<CollateralService>,
    pub loan_service: Arc<LoanService>,
    pub repayment_service: Arc<RepaymentService>,
    /// `None` when running on the in-memory store
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        collateral_service: Arc<CollateralService>,
        loan_service: Arc<LoanService>,
        repayment_service: Arc<RepaymentService>,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            collateral_service,
            loan_service,
            repayment_service,
            db_pool,
        }
    }
}

impl FromRef<AppState> for Arc<CollateralService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.collateral_service.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for Arc<RepaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.repayment_service.clone()
    }
}

impl FromRef<AppState> for Option<PgPool> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}
