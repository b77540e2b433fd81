//! Collateral persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Collateral, CollateralStatus};
use crate::db::RepoError;

#[async_trait]
pub trait CollateralRepository: Send + Sync {
    async fn create(&self, collateral: &Collateral) -> Result<Collateral, RepoError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Collateral>, RepoError>;

    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Vec<Collateral>, RepoError>;

    async fn get_by_tx_hash(&self, tx_hash: &str) -> Result<Option<Collateral>, RepoError>;

    async fn list_all(&self) -> Result<Vec<Collateral>, RepoError>;

    /// Overwrite every mutable field of an existing record
    async fn update(&self, collateral: &Collateral) -> Result<Collateral, RepoError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: CollateralStatus,
    ) -> Result<Collateral, RepoError>;

    /// Record the verified deposit transaction and move to `status`
    async fn update_tx_info(
        &self,
        id: Uuid,
        tx_hash: &str,
        wallet_address: Option<&str>,
        verified_at: DateTime<Utc>,
        status: CollateralStatus,
    ) -> Result<Collateral, RepoError>;
}

#[derive(Clone)]
pub struct PgCollateralRepository {
    db_pool: PgPool,
}

impl PgCollateralRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CollateralRepository for PgCollateralRepository {
    async fn create(&self, c: &Collateral) -> Result<Collateral, RepoError> {
        let collateral = sqlx::query_as::<_, Collateral>(
            r#"
            INSERT INTO collaterals (
                id, user_id, loan_request_id, asset_symbol, asset_amount, asset_value,
                required_value, fiat_currency, fiat_amount, ltv, status, tx_hash,
                wallet_address, verified_at, release_requested_at, release_resolved_at,
                release_note, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(c.id)
        .bind(c.user_id)
        .bind(c.loan_request_id)
        .bind(c.asset_symbol)
        .bind(c.asset_amount)
        .bind(c.asset_value)
        .bind(c.required_value)
        .bind(c.fiat_currency)
        .bind(c.fiat_amount)
        .bind(c.ltv)
        .bind(c.status)
        .bind(&c.tx_hash)
        .bind(&c.wallet_address)
        .bind(c.verified_at)
        .bind(c.release_requested_at)
        .bind(c.release_resolved_at)
        .bind(&c.release_note)
        .bind(c.created_at)
        .bind(c.updated_at)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(collateral)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Collateral>, RepoError> {
        let collateral = sqlx::query_as::<_, Collateral>("SELECT * FROM collaterals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(collateral)
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Vec<Collateral>, RepoError> {
        let collaterals = sqlx::query_as::<_, Collateral>(
            "SELECT * FROM collaterals WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(collaterals)
    }

    async fn get_by_tx_hash(&self, tx_hash: &str) -> Result<Option<Collateral>, RepoError> {
        let collateral =
            sqlx::query_as::<_, Collateral>("SELECT * FROM collaterals WHERE tx_hash = $1")
                .bind(tx_hash)
                .fetch_optional(&self.db_pool)
                .await?;

        Ok(collateral)
    }

    async fn list_all(&self) -> Result<Vec<Collateral>, RepoError> {
        let collaterals =
            sqlx::query_as::<_, Collateral>("SELECT * FROM collaterals ORDER BY created_at DESC")
                .fetch_all(&self.db_pool)
                .await?;

        Ok(collaterals)
    }

    async fn update(&self, c: &Collateral) -> Result<Collateral, RepoError> {
        sqlx::query_as::<_, Collateral>(
            r#"
            UPDATE collaterals
            SET loan_request_id = $2, asset_amount = $3, asset_value = $4, required_value = $5,
                fiat_amount = $6, ltv = $7, status = $8, tx_hash = $9, wallet_address = $10,
                verified_at = $11, release_requested_at = $12, release_resolved_at = $13,
                release_note = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(c.id)
        .bind(c.loan_request_id)
        .bind(c.asset_amount)
        .bind(c.asset_value)
        .bind(c.required_value)
        .bind(c.fiat_amount)
        .bind(c.ltv)
        .bind(c.status)
        .bind(&c.tx_hash)
        .bind(&c.wallet_address)
        .bind(c.verified_at)
        .bind(c.release_requested_at)
        .bind(c.release_resolved_at)
        .bind(&c.release_note)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(RepoError::NotFound(c.id))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CollateralStatus,
    ) -> Result<Collateral, RepoError> {
        sqlx::query_as::<_, Collateral>(
            "UPDATE collaterals SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(RepoError::NotFound(id))
    }

    async fn update_tx_info(
        &self,
        id: Uuid,
        tx_hash: &str,
        wallet_address: Option<&str>,
        verified_at: DateTime<Utc>,
        status: CollateralStatus,
    ) -> Result<Collateral, RepoError> {
        sqlx::query_as::<_, Collateral>(
            r#"
            UPDATE collaterals
            SET tx_hash = $2, wallet_address = COALESCE($3, wallet_address),
                verified_at = $4, status = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tx_hash)
        .bind(wallet_address)
        .bind(verified_at)
        .bind(status)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(RepoError::NotFound(id))
    }
}
