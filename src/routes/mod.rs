//! Route definitions for the Loanee API

mod admin;
mod collateral;
mod loan;

pub use admin::admin_routes;
pub use collateral::collateral_routes;
pub use loan::loan_routes;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::config::Config;
use crate::handlers::health_check;
use crate::middleware::{self, RateLimiter};
use crate::state::AppState;

/// Assemble every route with the middleware stack
pub fn app(state: AppState, config: &Config) -> Router {
    let rate_limiter = RateLimiter::new(config.rate_limit_rps);
    spawn_bucket_cleanup(rate_limiter.clone());

    let router = Router::new()
        .route("/health", get(health_check))
        .merge(collateral_routes())
        .merge(loan_routes())
        .merge(admin_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit,
        ))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()));

    if config.environment.is_production() {
        router.layer(axum::middleware::from_fn(middleware::hsts_header))
    } else {
        router
    }
}

/// Drop buckets of idle callers once a minute
fn spawn_bucket_cleanup(limiter: RateLimiter) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };
    handle.spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.cleanup(Duration::from_secs(300)).await;
        }
    });
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default().trim();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
