//! Loan persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Loan, LoanStatus};
use crate::db::RepoError;

#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn create(&self, loan: &Loan) -> Result<Loan, RepoError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Loan>, RepoError>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>, RepoError>;

    async fn list_all(&self) -> Result<Vec<Loan>, RepoError>;

    /// Overwrite every mutable field of an existing loan
    async fn update(&self, loan: &Loan) -> Result<Loan, RepoError>;

    async fn update_status(&self, id: Uuid, status: LoanStatus) -> Result<Loan, RepoError>;

    /// Loans in `status` whose next due date is before `due_before`
    async fn list_overdue(
        &self,
        status: LoanStatus,
        due_before: DateTime<Utc>,
    ) -> Result<Vec<Loan>, RepoError>;
}

#[derive(Clone)]
pub struct PgLoanRepository {
    db_pool: PgPool,
}

impl PgLoanRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl LoanRepository for PgLoanRepository {
    async fn create(&self, loan: &Loan) -> Result<Loan, RepoError> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                id, user_id, collateral_id, fiat_currency, amount_requested,
                amount_approved, principal_outstanding, interest_rate, duration_months,
                disbursed_at, next_due_date, total_repaid, penalty_accrued,
                last_payment_at, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(loan.user_id)
        .bind(loan.collateral_id)
        .bind(loan.fiat_currency)
        .bind(loan.amount_requested)
        .bind(loan.amount_approved)
        .bind(loan.principal_outstanding)
        .bind(loan.interest_rate)
        .bind(loan.duration_months)
        .bind(loan.disbursed_at)
        .bind(loan.next_due_date)
        .bind(loan.total_repaid)
        .bind(loan.penalty_accrued)
        .bind(loan.last_payment_at)
        .bind(loan.status)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(loan)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Loan>, RepoError> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(loan)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>, RepoError> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(loans)
    }

    async fn list_all(&self) -> Result<Vec<Loan>, RepoError> {
        let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans ORDER BY created_at DESC")
            .fetch_all(&self.db_pool)
            .await?;

        Ok(loans)
    }

    async fn update(&self, loan: &Loan) -> Result<Loan, RepoError> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET amount_approved = $2, principal_outstanding = $3, interest_rate = $4,
                disbursed_at = $5, next_due_date = $6, total_repaid = $7,
                penalty_accrued = $8, last_payment_at = $9, status = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(loan.amount_approved)
        .bind(loan.principal_outstanding)
        .bind(loan.interest_rate)
        .bind(loan.disbursed_at)
        .bind(loan.next_due_date)
        .bind(loan.total_repaid)
        .bind(loan.penalty_accrued)
        .bind(loan.last_payment_at)
        .bind(loan.status)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(RepoError::NotFound(loan.id))
    }

    async fn update_status(&self, id: Uuid, status: LoanStatus) -> Result<Loan, RepoError> {
        sqlx::query_as::<_, Loan>(
            "UPDATE loans SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(RepoError::NotFound(id))
    }

    async fn list_overdue(
        &self,
        status: LoanStatus,
        due_before: DateTime<Utc>,
    ) -> Result<Vec<Loan>, RepoError> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE status = $1 AND next_due_date IS NOT NULL AND next_due_date < $2
            ORDER BY next_due_date
            "#,
        )
        .bind(status)
        .bind(due_before)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(loans)
    }
}
