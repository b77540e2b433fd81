use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::Payment;
use crate::db::RepoError;

/// Append-only payment ledger
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<Payment, RepoError>;

    /// Oldest first
    async fn list_by_loan(&self, loan_id: Uuid) -> Result<Vec<Payment>, RepoError>;
}

#[derive(Clone)]
pub struct PgPaymentRepository {
    db_pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create(&self, p: &Payment) -> Result<Payment, RepoError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, loan_id, user_id, amount, currency, method, reference,
                principal_paid, interest_paid, penalty_paid, status, paid_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(p.id)
        .bind(p.loan_id)
        .bind(p.user_id)
        .bind(p.amount)
        .bind(p.currency)
        .bind(&p.method)
        .bind(&p.reference)
        .bind(p.principal_paid)
        .bind(p.interest_paid)
        .bind(p.penalty_paid)
        .bind(p.status)
        .bind(p.paid_at)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(payment)
    }

    async fn list_by_loan(&self, loan_id: Uuid) -> Result<Vec<Payment>, RepoError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE loan_id = $1 ORDER BY paid_at ASC",
        )
        .bind(loan_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(payments)
    }
}
