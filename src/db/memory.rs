//! In-memory store
//!
//! Implements every repository trait over process memory. Used by `STORAGE=memory`
//! runs and by the test suite. Writes can be made to fail per entity to exercise
//! error paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::RepoError;
use crate::collateral::{Collateral, CollateralRepository, CollateralStatus};
use crate::loan::{Loan, LoanRepository, LoanStatus};
use crate::repayment::{Payment, PaymentRepository};

#[derive(Default)]
pub struct MemoryStore {
    collaterals: RwLock<HashMap<Uuid, Collateral>>,
    loans: RwLock<HashMap<Uuid, Loan>>,
    payments: RwLock<Vec<Payment>>,
    fail_collateral_writes: AtomicBool,
    fail_loan_writes: AtomicBool,
    fail_payment_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_collateral_writes(&self, fail: bool) {
        self.fail_collateral_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loan_writes(&self, fail: bool) {
        self.fail_loan_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_payment_writes(&self, fail: bool) {
        self.fail_payment_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn collateral_count(&self) -> usize {
        self.collaterals.read().await.len()
    }

    pub async fn loan_count(&self) -> usize {
        self.loans.read().await.len()
    }

    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }
}

fn check(flag: &AtomicBool, what: &str) -> Result<(), RepoError> {
    if flag.load(Ordering::SeqCst) {
        return Err(RepoError::Unavailable(format!("{} writes disabled", what)));
    }
    Ok(())
}

/// Mirrors the unique index on `collaterals(tx_hash)`
fn ensure_unique_tx(
    collaterals: &HashMap<Uuid, Collateral>,
    tx_hash: &str,
    owner: Uuid,
) -> Result<(), RepoError> {
    let taken = collaterals
        .values()
        .any(|c| c.id != owner && c.tx_hash.as_deref() == Some(tx_hash));
    if taken {
        return Err(RepoError::Duplicate(format!("tx_hash {}", tx_hash)));
    }
    Ok(())
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[async_trait]
impl CollateralRepository for MemoryStore {
    async fn create(&self, collateral: &Collateral) -> Result<Collateral, RepoError> {
        check(&self.fail_collateral_writes, "collateral")?;
        let mut collaterals = self.collaterals.write().await;
        if let Some(hash) = &collateral.tx_hash {
            ensure_unique_tx(&collaterals, hash, collateral.id)?;
        }
        collaterals.insert(collateral.id, collateral.clone());
        Ok(collateral.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Collateral>, RepoError> {
        Ok(self.collaterals.read().await.get(&id).cloned())
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Vec<Collateral>, RepoError> {
        let mut found: Vec<Collateral> = self
            .collaterals
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut found, |c| c.created_at);
        Ok(found)
    }

    async fn get_by_tx_hash(&self, tx_hash: &str) -> Result<Option<Collateral>, RepoError> {
        Ok(self
            .collaterals
            .read()
            .await
            .values()
            .find(|c| c.tx_hash.as_deref() == Some(tx_hash))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Collateral>, RepoError> {
        let mut all: Vec<Collateral> = self.collaterals.read().await.values().cloned().collect();
        newest_first(&mut all, |c| c.created_at);
        Ok(all)
    }

    async fn update(&self, collateral: &Collateral) -> Result<Collateral, RepoError> {
        check(&self.fail_collateral_writes, "collateral")?;
        let mut collaterals = self.collaterals.write().await;
        let stored = collaterals
            .get_mut(&collateral.id)
            .ok_or(RepoError::NotFound(collateral.id))?;

        let created_at = stored.created_at;
        *stored = collateral.clone();
        stored.created_at = created_at;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CollateralStatus,
    ) -> Result<Collateral, RepoError> {
        check(&self.fail_collateral_writes, "collateral")?;
        let mut collaterals = self.collaterals.write().await;
        ensure_unique_tx(&collaterals, tx_hash, id)?;
        let stored = collaterals.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn update_tx_info(
        &self,
        id: Uuid,
        tx_hash: &str,
        wallet_address: Option<&str>,
        verified_at: DateTime<Utc>,
        status: CollateralStatus,
    ) -> Result<Collateral, RepoError> {
        check(&self.fail_collateral_writes, "collateral")?;
        let mut collaterals = self.collaterals.write().await;
        let stored = collaterals.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        stored.tx_hash = Some(tx_hash.to_string());
        if let Some(wallet) = wallet_address {
            stored.wallet_address = Some(wallet.to_string());
        }
        stored.verified_at = Some(verified_at);
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[async_trait]
impl LoanRepository for MemoryStore {
    async fn create(&self, loan: &Loan) -> Result<Loan, RepoError> {
        check(&self.fail_loan_writes, "loan")?;
        self.loans.write().await.insert(loan.id, loan.clone());
        Ok(loan.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Loan>, RepoError> {
        Ok(self.loans.read().await.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>, RepoError> {
        let mut found: Vec<Loan> = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut found, |l| l.created_at);
        Ok(found)
    }

    async fn list_all(&self) -> Result<Vec<Loan>, RepoError> {
        let mut all: Vec<Loan> = self.loans.read().await.values().cloned().collect();
        newest_first(&mut all, |l| l.created_at);
        Ok(all)
    }

    async fn update(&self, loan: &Loan) -> Result<Loan, RepoError> {
        check(&self.fail_loan_writes, "loan")?;
        let mut loans = self.loans.write().await;
        let stored = loans.get_mut(&loan.id).ok_or(RepoError::NotFound(loan.id))?;

        let created_at = stored.created_at;
        *stored = loan.clone();
        stored.created_at = created_at;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn update_status(&self, id: Uuid, status: LoanStatus) -> Result<Loan, RepoError> {
        check(&self.fail_loan_writes, "loan")?;
        let mut loans = self.loans.write().await;
        let stored = loans.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_overdue(
        &self,
        status: LoanStatus,
        due_before: DateTime<Utc>,
    ) -> Result<Vec<Loan>, RepoError> {
        let mut found: Vec<Loan> = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.status == status)
            .filter(|l| l.next_due_date.map(|d| d < due_before).unwrap_or(false))
            .cloned()
            .collect();
        found.sort_by_key(|l| l.next_due_date);
        Ok(found)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn create(&self, payment: &Payment) -> Result<Payment, RepoError> {
        check(&self.fail_payment_writes, "payment")?;
        self.payments.write().await.push(payment.clone());
        Ok(payment.clone())
    }

    async fn list_by_loan(&self, loan_id: Uuid) -> Result<Vec<Payment>, RepoError> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.loan_id == loan_id)
            .cloned()
            .collect())
    }
}
