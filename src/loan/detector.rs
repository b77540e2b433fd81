use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::service::LoanService;

/// Background job moving long-delinquent loans to `defaulted`
pub async fn default_detector(loan_service: Arc<LoanService>, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Starting default detector");

    loop {
        tokio::time::sleep(interval).await;

        match loan_service.detect_defaults(Utc::now()).await {
            Ok(defaulted) if defaulted.is_empty() => {
                tracing::debug!("No loans defaulted");
            }
            Ok(defaulted) => {
                tracing::info!(count = defaulted.len(), "Loans moved to defaulted");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error detecting defaults");
            }
        }
    }
}
