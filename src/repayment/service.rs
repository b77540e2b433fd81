use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::model::{Payment, PaymentStatus, RepaymentInput, RepaymentResult};
use super::repository::PaymentRepository;
use crate::error::{LendingError, LendingResult};
use crate::loan::LoanService;

/// Records each applied repayment as a ledger row
pub struct RepaymentService {
    repo: Arc<dyn PaymentRepository>,
    loans: Arc<LoanService>,
}

impl RepaymentService {
    pub fn new(repo: Arc<dyn PaymentRepository>, loans: Arc<LoanService>) -> Self {
        Self { repo, loans }
    }

    /// Apply a repayment to the loan and write its payment row
    ///
    /// The loan stays locked until the payment row is written, so two repayments
    /// against one loan never interleave.
    pub async fn record_repayment(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
        input: RepaymentInput,
    ) -> LendingResult<RepaymentResult> {
        if input.amount <= Decimal::ZERO {
            return Err(LendingError::InvalidInput(
                "repayment amount must be greater than zero".to_string(),
            ));
        }

        let guard = self.loans.lock_loan(loan_id).await;
        let loan = self.loans.get_user_loan(user_id, loan_id).await?;
        if input.currency != loan.fiat_currency {
            return Err(LendingError::InvalidInput(format!(
                "loan is denominated in {}, repayment was in {}",
                loan.fiat_currency, input.currency
            )));
        }

        let (loan, breakdown) = self
            .loans
            .apply_repayment_locked(&guard, user_id, input.amount)
            .await?;

        let payment = Payment {
            id: Uuid::new_v4(),
            loan_id,
            user_id,
            amount: input.amount,
            currency: input.currency,
            method: input.method,
            reference: input.reference,
            principal_paid: breakdown.principal,
            interest_paid: breakdown.interest,
            penalty_paid: breakdown.penalty,
            status: PaymentStatus::Completed,
            paid_at: Utc::now(),
        };

        let payment = match self.repo.create(&payment).await {
            Ok(payment) => payment,
            Err(e) => {
                // The loan row already reflects this repayment.
                tracing::error!(
                    loan_id = %loan_id,
                    user_id = %user_id,
                    amount = %input.amount,
                    error = %e,
                    "Repayment applied but payment record was not written"
                );
                return Err(e.into());
            }
        };
        drop(guard);

        tracing::info!(
            payment_id = %payment.id,
            loan_id = %loan_id,
            amount = %payment.amount,
            currency = %payment.currency,
            "Repayment recorded"
        );

        Ok(RepaymentResult {
            remaining_principal: loan.principal_outstanding,
            loan,
            payment,
        })
    }

    /// Payments for a loan the caller owns
    pub async fn list_repayments(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
    ) -> LendingResult<Vec<Payment>> {
        let loan = self.loans.get_loan(loan_id).await?;
        if loan.user_id != user_id {
            return Err(LendingError::NotFound(format!("loan {}", loan_id)));
        }

        Ok(self.repo.list_by_loan(loan_id).await?)
    }
}
