//! Admin route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/collateral", get(list_all_collaterals))
        .route(
            "/api/admin/collateral/:id/release/approve",
            post(approve_release),
        )
        .route(
            "/api/admin/collateral/:id/release/reject",
            post(reject_release),
        )
        .route("/api/admin/loans", get(list_all_loans))
        .route("/api/admin/loans/:id/approve", post(approve_loan))
        .route("/api/admin/loans/:id/disburse", post(disburse_loan))
}
