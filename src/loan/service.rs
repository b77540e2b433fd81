//! Loan service layer - loan lifecycle and repayment application

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::locks::{LoanGuard, LoanLocks};
use super::model::{Loan, LoanStatus, RepaymentBreakdown};
use super::repository::LoanRepository;
use super::waterfall::{self, WaterfallTerms};
use crate::collateral::valuation::round_fiat;
use crate::collateral::{Collateral, CollateralRepository};
use crate::config::LoanConfig;
use crate::error::{LendingError, LendingResult};

/// Loan service for managing the loan lifecycle
pub struct LoanService {
    repo: Arc<dyn LoanRepository>,
    collaterals: Arc<dyn CollateralRepository>,
    config: LoanConfig,
    locks: LoanLocks,
}

impl LoanService {
    pub fn new(
        repo: Arc<dyn LoanRepository>,
        collaterals: Arc<dyn CollateralRepository>,
        config: LoanConfig,
    ) -> Self {
        Self {
            repo,
            collaterals,
            config,
            locks: LoanLocks::new(),
        }
    }

    fn terms(&self) -> WaterfallTerms {
        WaterfallTerms {
            repayment_frequency_days: self.config.repayment_frequency_days,
            grace_period_days: self.config.grace_period_days,
            penalty_apr: self.config.penalty_apr,
        }
    }

    /// Originate a pending loan for the full fiat amount of a collateral record
    ///
    /// Principal stays at zero until disbursement.
    pub async fn create_from_collateral(&self, collateral: &Collateral) -> LendingResult<Loan> {
        if collateral.fiat_amount <= Decimal::ZERO {
            return Err(LendingError::InvalidInput(
                "collateral carries no loan amount".to_string(),
            ));
        }

        let now = Utc::now();
        let draft = Loan {
            id: Uuid::new_v4(),
            user_id: collateral.user_id,
            collateral_id: collateral.id,
            fiat_currency: collateral.fiat_currency,
            amount_requested: collateral.fiat_amount,
            amount_approved: collateral.fiat_amount,
            principal_outstanding: Decimal::ZERO,
            interest_rate: self.config.default_interest_rate,
            duration_months: self.config.duration_months,
            disbursed_at: None,
            next_due_date: None,
            total_repaid: Decimal::ZERO,
            penalty_accrued: Decimal::ZERO,
            last_payment_at: None,
            status: LoanStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let loan = self.repo.create(&draft).await?;
        tracing::info!(
            loan_id = %loan.id,
            collateral_id = %collateral.id,
            user_id = %loan.user_id,
            amount = %loan.amount_requested,
            "Loan originated"
        );
        Ok(loan)
    }

    /// Approve a pending loan; a missing or non-positive amount approves the requested amount
    pub async fn approve_loan(
        &self,
        loan_id: Uuid,
        amount: Option<Decimal>,
    ) -> LendingResult<Loan> {
        let _guard = self.locks.lock(loan_id).await;
        let mut loan = self.find(loan_id).await?;

        if loan.status != LoanStatus::Pending {
            return Err(LendingError::InvalidState(format!(
                "loan is {}, expected pending",
                loan.status.as_str()
            )));
        }

        let amount = amount
            .filter(|a| *a > Decimal::ZERO)
            .unwrap_or(loan.amount_requested);

        let collateral = self
            .collaterals
            .get_by_id(loan.collateral_id)
            .await?
            .ok_or_else(|| LendingError::NotFound(format!("collateral {}", loan.collateral_id)))?;
        let limit = loan_limit(&collateral);
        if amount > limit {
            return Err(LendingError::InvalidInput(format!(
                "approved amount {} exceeds collateral limit {}",
                amount, limit
            )));
        }

        loan.amount_approved = amount;
        loan.status = LoanStatus::Approved;
        let loan = self.repo.update(&loan).await?;

        tracing::info!(loan_id = %loan.id, amount = %amount, "Loan approved");
        Ok(loan)
    }

    /// Pay out an approved loan and start its repayment schedule
    pub async fn disburse_loan(&self, loan_id: Uuid) -> LendingResult<Loan> {
        let _guard = self.locks.lock(loan_id).await;
        let mut loan = self.find(loan_id).await?;

        if loan.status != LoanStatus::Approved {
            return Err(LendingError::InvalidState(format!(
                "loan is {}, expected approved",
                loan.status.as_str()
            )));
        }

        let now = Utc::now();
        loan.disbursed_at = Some(now);
        loan.principal_outstanding = loan.amount_approved;
        loan.next_due_date = Some(now + Duration::days(self.config.repayment_frequency_days));
        loan.status = LoanStatus::Active;
        let loan = self.repo.update(&loan).await?;

        tracing::info!(
            loan_id = %loan.id,
            principal = %loan.principal_outstanding,
            "Loan disbursed"
        );
        Ok(loan)
    }

    /// Take exclusive write access to a loan
    pub async fn lock_loan(&self, loan_id: Uuid) -> LoanGuard {
        self.locks.lock(loan_id).await
    }

    /// Apply a repayment through the waterfall
    pub async fn apply_repayment(
        &self,
        loan_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
    ) -> LendingResult<(Loan, RepaymentBreakdown)> {
        let guard = self.locks.lock(loan_id).await;
        self.apply_repayment_locked(&guard, user_id, amount).await
    }

    /// [`apply_repayment`](Self::apply_repayment) for a caller already holding the loan's guard
    ///
    /// Loans without outstanding principal are returned unchanged with a zero breakdown.
    pub async fn apply_repayment_locked(
        &self,
        guard: &LoanGuard,
        user_id: Uuid,
        amount: Decimal,
    ) -> LendingResult<(Loan, RepaymentBreakdown)> {
        let mut loan = self.find(guard.loan_id()).await?;

        if loan.user_id != user_id {
            return Err(LendingError::Forbidden(
                "loan belongs to another user".to_string(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(LendingError::InvalidInput(
                "repayment amount must be greater than zero".to_string(),
            ));
        }
        if loan.status == LoanStatus::Defaulted {
            return Err(LendingError::InvalidState(
                "loan has defaulted".to_string(),
            ));
        }
        if loan.principal_outstanding <= Decimal::ZERO {
            return Ok((loan, RepaymentBreakdown::default()));
        }

        let breakdown = waterfall::apply(&mut loan, amount, &self.terms(), Utc::now());
        let loan = self.repo.update(&loan).await?;

        tracing::info!(
            loan_id = %loan.id,
            user_id = %user_id,
            amount = %amount,
            penalty = %breakdown.penalty,
            interest = %breakdown.interest,
            principal = %breakdown.principal,
            remaining = %loan.principal_outstanding,
            status = loan.status.as_str(),
            "Repayment applied"
        );
        Ok((loan, breakdown))
    }

    /// Move loans that stayed unpaid too long to `defaulted`
    ///
    /// Both `active` and `delinquent` loans are candidates: a disbursed loan that never
    /// saw a repayment is still `active`. A loan defaults once `now` is past its due
    /// date plus the grace period plus the configured default window. Returns the ids
    /// that changed.
    pub async fn detect_defaults(&self, now: DateTime<Utc>) -> LendingResult<Vec<Uuid>> {
        let cutoff = now
            - Duration::days(self.config.grace_period_days)
            - Duration::days(self.config.default_after_days);

        let mut candidates = Vec::new();
        for status in [LoanStatus::Active, LoanStatus::Delinquent] {
            candidates.extend(self.repo.list_overdue(status, cutoff).await?);
        }

        let mut defaulted = Vec::new();
        for candidate in candidates {
            let _guard = self.locks.lock(candidate.id).await;

            // Re-read under the lock; a repayment may have landed meanwhile.
            let Some(loan) = self.repo.get_by_id(candidate.id).await? else {
                continue;
            };
            let overdue = loan.next_due_date.map(|due| due < cutoff).unwrap_or(false);
            let open = matches!(loan.status, LoanStatus::Active | LoanStatus::Delinquent);
            if !open || !overdue {
                continue;
            }

            self.repo
                .update_status(loan.id, LoanStatus::Defaulted)
                .await?;
            tracing::warn!(
                loan_id = %loan.id,
                user_id = %loan.user_id,
                previous_status = loan.status.as_str(),
                "Loan defaulted"
            );
            defaulted.push(loan.id);
        }

        Ok(defaulted)
    }

    pub async fn get_loan(&self, loan_id: Uuid) -> LendingResult<Loan> {
        self.find(loan_id).await
    }

    pub async fn get_user_loan(&self, user_id: Uuid, loan_id: Uuid) -> LendingResult<Loan> {
        let loan = self.find(loan_id).await?;
        if loan.user_id != user_id {
            return Err(LendingError::Forbidden(
                "loan belongs to another user".to_string(),
            ));
        }
        Ok(loan)
    }

    pub async fn list_user_loans(&self, user_id: Uuid) -> LendingResult<Vec<Loan>> {
        Ok(self.repo.list_by_user(user_id).await?)
    }

    pub async fn list_all_loans(&self) -> LendingResult<Vec<Loan>> {
        Ok(self.repo.list_all().await?)
    }

    async fn find(&self, loan_id: Uuid) -> LendingResult<Loan> {
        self.repo
            .get_by_id(loan_id)
            .await?
            .ok_or_else(|| LendingError::NotFound(format!("loan {}", loan_id)))
    }
}

/// Most that may be lent against a collateral record
fn loan_limit(collateral: &Collateral) -> Decimal {
    round_fiat(collateral.asset_value * collateral.ltv).max(collateral.fiat_amount)
}
