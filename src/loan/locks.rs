//! Per-loan write serialization
//!
//! Every mutation of a loan happens while holding that loan's guard, so concurrent
//! repayments against the same loan apply one after another instead of overwriting
//! each other. Locks are per process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

const PRUNE_THRESHOLD: usize = 1024;

#[derive(Default)]
pub struct LoanLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Exclusive write access to one loan until dropped
pub struct LoanGuard {
    loan_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl LoanGuard {
    pub fn loan_id(&self) -> Uuid {
        self.loan_id
    }
}

impl LoanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, loan_id: Uuid) -> LoanGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            if locks.len() > PRUNE_THRESHOLD {
                // Entries nobody holds or waits on can be dropped.
                locks.retain(|_, m| Arc::strong_count(m) > 1);
            }
            locks
                .entry(loan_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        LoanGuard {
            loan_id,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of tracked loans
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
