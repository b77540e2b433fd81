//! Collateral route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn collateral_routes() -> Router<AppState> {
    Router::new()
        .route("/api/collateral/preview", get(preview_collateral))
        .route(
            "/api/collateral",
            post(create_collateral).get(list_my_collaterals),
        )
        .route("/api/collateral/lock", post(lock_collateral))
        .route("/api/collateral/:id", get(get_collateral))
        .route("/api/collateral/:id/verify", post(verify_collateral))
        .route("/api/collateral/:id/release", post(request_release))
}
