use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::model::{Collateral, CollateralQuote, CollateralStatus};
use super::repository::CollateralRepository;
use super::valuation::{self, ensure_ltv};
use crate::chain::{TransactionVerifier, Verdict};
use crate::config::LoanConfig;
use crate::error::{LendingError, LendingResult};
use crate::loan::LoanService;
use crate::models::{AssetSymbol, FiatCurrency};
use crate::oracle::PriceOracle;

/// Owns the collateral lifecycle: preview, creation, locking and release
pub struct CollateralService {
    repo: Arc<dyn CollateralRepository>,
    oracle: Arc<dyn PriceOracle>,
    verifier: Arc<dyn TransactionVerifier>,
    loans: Option<Arc<LoanService>>,
    config: LoanConfig,
}

impl CollateralService {
    pub fn new(
        repo: Arc<dyn CollateralRepository>,
        oracle: Arc<dyn PriceOracle>,
        verifier: Arc<dyn TransactionVerifier>,
        config: LoanConfig,
    ) -> Self {
        Self {
            repo,
            oracle,
            verifier,
            loans: None,
            config,
        }
    }

    /// Originate a pending loan whenever a collateral request is created
    pub fn with_loan_origination(mut self, loans: Arc<LoanService>) -> Self {
        self.loans = Some(loans);
        self
    }

    /// Quote the collateral needed for `loan_amount` in every supported asset
    ///
    /// Assets the oracle cannot price are left out. Nothing is persisted.
    pub async fn preview_collateral(
        &self,
        loan_amount: Decimal,
        fiat: FiatCurrency,
    ) -> LendingResult<Vec<CollateralQuote>> {
        if loan_amount <= Decimal::ZERO {
            return Err(LendingError::InvalidInput(
                "loan amount must be greater than zero".to_string(),
            ));
        }
        let ltv = self.config.default_ltv;
        ensure_ltv(ltv)?;

        let symbols: Vec<&str> = AssetSymbol::ALL.iter().map(|a| a.as_str()).collect();
        let prices = self.oracle.get_prices(&symbols, fiat).await?;

        let mut quotes = Vec::with_capacity(AssetSymbol::ALL.len());
        for asset in AssetSymbol::ALL {
            let Some(price) = prices.get(asset.as_str()).copied() else {
                continue;
            };
            match valuation::requirement(loan_amount, ltv, price) {
                Ok(req) => quotes.push(CollateralQuote {
                    asset_symbol: asset,
                    price,
                    fiat_currency: fiat,
                    ltv,
                    required_value: req.required_value,
                    required_amount: req.required_amount,
                }),
                Err(e) => tracing::warn!(asset = %asset, error = %e, "Skipping asset in preview"),
            }
        }

        if quotes.is_empty() {
            return Err(LendingError::UpstreamUnavailable(
                "no supported asset could be priced".to_string(),
            ));
        }

        Ok(quotes)
    }

    /// Persist a pending collateral request for `loan_amount`
    ///
    /// Side effect: when loan origination is wired in, a pending loan is originated from
    /// the new record. That step is best-effort. A failure is logged and the collateral
    /// is still returned, so callers must not assume a loan exists afterwards.
    pub async fn create_collateral_request(
        &self,
        user_id: Uuid,
        loan_amount: Decimal,
        fiat: FiatCurrency,
        asset: AssetSymbol,
    ) -> LendingResult<Collateral> {
        if loan_amount <= Decimal::ZERO {
            return Err(LendingError::InvalidInput(
                "loan amount must be greater than zero".to_string(),
            ));
        }
        let ltv = self.config.default_ltv;
        ensure_ltv(ltv)?;

        let price = self.oracle.get_price(asset.as_str(), fiat).await?;
        let req = valuation::requirement(loan_amount, ltv, price)?;

        let now = Utc::now();
        let draft = Collateral {
            id: Uuid::new_v4(),
            user_id,
            loan_request_id: None,
            asset_symbol: asset,
            asset_amount: req.required_amount,
            asset_value: req.required_value,
            required_value: req.required_value,
            fiat_currency: fiat,
            fiat_amount: loan_amount,
            ltv,
            status: CollateralStatus::Pending,
            tx_hash: None,
            wallet_address: None,
            verified_at: None,
            release_requested_at: None,
            release_resolved_at: None,
            release_note: None,
            created_at: now,
            updated_at: now,
        };

        let collateral = self.repo.create(&draft).await?;
        tracing::info!(
            collateral_id = %collateral.id,
            user_id = %user_id,
            asset = %asset,
            amount = %collateral.asset_amount,
            "Collateral request created"
        );

        Ok(self.originate_loan(collateral).await)
    }

    async fn originate_loan(&self, collateral: Collateral) -> Collateral {
        let Some(loans) = &self.loans else {
            return collateral;
        };

        let loan = match loans.create_from_collateral(&collateral).await {
            Ok(loan) => loan,
            Err(e) => {
                tracing::warn!(
                    collateral_id = %collateral.id,
                    error = %e,
                    "Loan origination failed, collateral kept without a loan"
                );
                return collateral;
            }
        };

        let mut linked = collateral.clone();
        linked.loan_request_id = Some(loan.id);
        match self.repo.update(&linked).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!(
                    collateral_id = %collateral.id,
                    loan_id = %loan.id,
                    error = %e,
                    "Could not link originated loan to collateral"
                );
                collateral
            }
        }
    }

    /// Record an already-deposited collateral, active as soon as the deposit verifies
    ///
    /// Nothing is persisted unless the verifier accepts the transaction.
    pub async fn lock_collateral(
        &self,
        user_id: Uuid,
        asset: AssetSymbol,
        tx_hash: &str,
        amount: Decimal,
        wallet_address: Option<String>,
        fiat: FiatCurrency,
    ) -> LendingResult<Collateral> {
        let tx_hash = tx_hash.trim();
        if tx_hash.is_empty() {
            return Err(LendingError::InvalidInput("tx_hash is required".to_string()));
        }
        if amount <= Decimal::ZERO {
            return Err(LendingError::InvalidInput(
                "amount must be greater than zero".to_string(),
            ));
        }
        let ltv = self.config.default_ltv;
        ensure_ltv(ltv)?;

        self.ensure_unused_tx(tx_hash).await?;
        self.verify_deposit(tx_hash, asset, amount).await?;

        let price = self.oracle.get_price(asset.as_str(), fiat).await?;
        let value = valuation::valuation(amount, ltv, price)?;

        let now = Utc::now();
        let draft = Collateral {
            id: Uuid::new_v4(),
            user_id,
            loan_request_id: None,
            asset_symbol: asset,
            asset_amount: amount,
            asset_value: value.asset_value,
            required_value: value.asset_value,
            fiat_currency: fiat,
            fiat_amount: value.loan_value,
            ltv,
            status: CollateralStatus::Active,
            tx_hash: Some(tx_hash.to_string()),
            wallet_address,
            verified_at: Some(now),
            release_requested_at: None,
            release_resolved_at: None,
            release_note: None,
            created_at: now,
            updated_at: now,
        };

        let collateral = self.repo.create(&draft).await?;
        tracing::info!(
            collateral_id = %collateral.id,
            user_id = %user_id,
            asset = %asset,
            tx_hash,
            asset_value = %collateral.asset_value,
            "Collateral locked"
        );

        Ok(collateral)
    }

    /// Activate a pending collateral request once its deposit verifies
    pub async fn verify_collateral(
        &self,
        user_id: Uuid,
        collateral_id: Uuid,
        tx_hash: &str,
        wallet_address: Option<&str>,
    ) -> LendingResult<Collateral> {
        let tx_hash = tx_hash.trim();
        if tx_hash.is_empty() {
            return Err(LendingError::InvalidInput("tx_hash is required".to_string()));
        }

        let collateral = self.owned(user_id, collateral_id).await?;
        if collateral.status != CollateralStatus::Pending {
            return Err(LendingError::InvalidState(format!(
                "collateral is {}, expected pending",
                collateral.status.as_str()
            )));
        }

        self.ensure_unused_tx(tx_hash).await?;
        self.verify_deposit(tx_hash, collateral.asset_symbol, collateral.asset_amount)
            .await?;

        let collateral = self
            .repo
            .update_tx_info(
                collateral_id,
                tx_hash,
                wallet_address,
                Utc::now(),
                CollateralStatus::Active,
            )
            .await?;

        tracing::info!(collateral_id = %collateral.id, tx_hash, "Collateral verified");
        Ok(collateral)
    }

    async fn ensure_unused_tx(&self, tx_hash: &str) -> LendingResult<()> {
        if let Some(existing) = self.repo.get_by_tx_hash(tx_hash).await? {
            return Err(LendingError::InvalidState(format!(
                "transaction already backs collateral {}",
                existing.id
            )));
        }
        Ok(())
    }

    async fn verify_deposit(
        &self,
        tx_hash: &str,
        asset: AssetSymbol,
        amount: Decimal,
    ) -> LendingResult<()> {
        match self.verifier.verify_transaction(tx_hash, asset, amount).await? {
            Verdict::Valid(data) => {
                tracing::debug!(tx_hash, confirmations = data.confirmations, "Deposit accepted");
                Ok(())
            }
            Verdict::Invalid { reason } => {
                tracing::info!(tx_hash, asset = %asset, reason = %reason, "Deposit rejected");
                Err(LendingError::VerificationFailed(reason))
            }
        }
    }

    pub async fn request_release(
        &self,
        user_id: Uuid,
        collateral_id: Uuid,
    ) -> LendingResult<Collateral> {
        let mut collateral = self.owned(user_id, collateral_id).await?;
        if collateral.status != CollateralStatus::Active {
            return Err(LendingError::InvalidState(format!(
                "collateral is {}, only active collateral can be released",
                collateral.status.as_str()
            )));
        }

        collateral.status = CollateralStatus::ReleaseRequested;
        collateral.release_requested_at = Some(Utc::now());
        collateral.release_resolved_at = None;
        collateral.release_note = None;

        let collateral = self.repo.update(&collateral).await?;
        tracing::info!(collateral_id = %collateral.id, user_id = %user_id, "Release requested");
        Ok(collateral)
    }

    /// Admin decision; the caller is already authorized
    pub async fn approve_release(&self, collateral_id: Uuid) -> LendingResult<Collateral> {
        let mut collateral = self.pending_release(collateral_id).await?;

        collateral.status = CollateralStatus::Released;
        collateral.release_resolved_at = Some(Utc::now());

        let collateral = self.repo.update(&collateral).await?;
        tracing::info!(collateral_id = %collateral.id, "Release approved");
        Ok(collateral)
    }

    /// Admin decision; returns the collateral to `active`
    pub async fn reject_release(
        &self,
        collateral_id: Uuid,
        reason: Option<String>,
    ) -> LendingResult<Collateral> {
        let mut collateral = self.pending_release(collateral_id).await?;

        collateral.status = CollateralStatus::Active;
        collateral.release_resolved_at = Some(Utc::now());
        collateral.release_note = reason.filter(|r| !r.trim().is_empty());

        let collateral = self.repo.update(&collateral).await?;
        tracing::info!(collateral_id = %collateral.id, "Release rejected");
        Ok(collateral)
    }

    async fn pending_release(&self, collateral_id: Uuid) -> LendingResult<Collateral> {
        let collateral = self.find(collateral_id).await?;
        if collateral.status != CollateralStatus::ReleaseRequested {
            return Err(LendingError::InvalidState(format!(
                "collateral is {}, no release pending",
                collateral.status.as_str()
            )));
        }
        Ok(collateral)
    }

    pub async fn get_collateral(
        &self,
        user_id: Uuid,
        collateral_id: Uuid,
    ) -> LendingResult<Collateral> {
        self.owned(user_id, collateral_id).await
    }

    pub async fn list_user_collaterals(&self, user_id: Uuid) -> LendingResult<Vec<Collateral>> {
        Ok(self.repo.get_by_user_id(user_id).await?)
    }

    pub async fn list_all_collaterals(&self) -> LendingResult<Vec<Collateral>> {
        Ok(self.repo.list_all().await?)
    }

    async fn find(&self, collateral_id: Uuid) -> LendingResult<Collateral> {
        self.repo
            .get_by_id(collateral_id)
            .await?
            .ok_or_else(|| LendingError::NotFound(format!("collateral {}", collateral_id)))
    }

    async fn owned(&self, user_id: Uuid, collateral_id: Uuid) -> LendingResult<Collateral> {
        let collateral = self.find(collateral_id).await?;
        if collateral.user_id != user_id {
            return Err(LendingError::Forbidden(
                "collateral belongs to another user".to_string(),
            ));
        }
        Ok(collateral)
    }
}
