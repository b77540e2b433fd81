//! Loanee Backend Server
//!
//! HTTP API for crypto-collateralized fiat loans: collateral deposits, loan approval and
//! disbursement, repayments, plus the background default detector.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use loanee_server::chain::build_verifier;
use loanee_server::collateral::{CollateralRepository, CollateralService, PgCollateralRepository};
use loanee_server::config::{Config, StorageBackend};
use loanee_server::db::{self, MemoryStore};
use loanee_server::loan::{default_detector, LoanRepository, LoanService, PgLoanRepository};
use loanee_server::oracle::build_price_oracle;
use loanee_server::repayment::{PaymentRepository, PgPaymentRepository, RepaymentService};
use loanee_server::routes;
use loanee_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        port = config.port,
        "Starting Loanee server"
    );

    let (collaterals, loans, payments, db_pool): (
        Arc<dyn CollateralRepository>,
        Arc<dyn LoanRepository>,
        Arc<dyn PaymentRepository>,
        _,
    ) = match config.storage {
        StorageBackend::Postgres => {
            tracing::info!(database = %config.database_url_masked(), "Connecting to database...");
            let pool = db::create_pool(&config)
                .await
                .context("failed to connect to database")?;
            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!("Database connected successfully");

            (
                Arc::new(PgCollateralRepository::new(pool.clone())),
                Arc::new(PgLoanRepository::new(pool.clone())),
                Arc::new(PgPaymentRepository::new(pool.clone())),
                Some(pool),
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store.clone(), store, None)
        }
    };

    let oracle = build_price_oracle(&config.pricing).context("failed to build price oracle")?;
    let verifier = build_verifier(&config.blockchain, &config.environment)
        .context("failed to build transaction verifier")?;

    let loan_service = Arc::new(LoanService::new(
        loans,
        collaterals.clone(),
        config.loan.clone(),
    ));
    let collateral_service = Arc::new(
        CollateralService::new(collaterals, oracle, verifier, config.loan.clone())
            .with_loan_origination(loan_service.clone()),
    );
    let repayment_service = Arc::new(RepaymentService::new(payments, loan_service.clone()));

    // Start default detector in background
    let detector_service = loan_service.clone();
    let detector_interval = Duration::from_secs(config.loan.default_check_interval_secs);
    tokio::spawn(async move {
        default_detector(detector_service, detector_interval).await;
        tracing::error!("Default detector task exited unexpectedly");
    });

    let app_state = AppState::new(
        collateral_service,
        loan_service,
        repayment_service,
        db_pool,
    );
    let app = routes::app(app_state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
