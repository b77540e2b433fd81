//! Loan and repayment route definitions

use axum::{routing::get, Router};

use crate::handlers::*;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", get(list_my_loans))
        .route("/api/loans/:id", get(get_loan))
        .route(
            "/api/loans/:id/repayments",
            get(list_repayments).post(create_repayment),
        )
}
