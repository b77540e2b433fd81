//! Collateral ledger flows against the in-memory store

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use common::harness;
use loanee_server::collateral::CollateralStatus;
use loanee_server::error::ErrorKind;
use loanee_server::loan::LoanStatus;
use loanee_server::models::{AssetSymbol, FiatCurrency};

#[tokio::test]
async fn test_preview_quotes_every_priced_asset() {
    let h = harness();

    let quotes = h
        .collaterals
        .preview_collateral(dec!(5000), FiatCurrency::Usd)
        .await
        .unwrap();

    assert_eq!(quotes.len(), 3);
    assert_eq!(quotes[0].asset_symbol, AssetSymbol::Btc);
    assert_eq!(quotes[0].required_value, dec!(10000));
    assert_eq!(quotes[0].required_amount, dec!(0.5));
    assert_eq!(quotes[1].required_amount, dec!(10));
    assert_eq!(quotes[2].required_amount, dec!(10000));
    assert!(quotes.iter().all(|q| q.ltv == dec!(0.5)));

    assert_eq!(h.store.collateral_count().await, 0);
}

#[tokio::test]
async fn test_preview_skips_unpriced_assets() {
    let h = harness();
    h.oracle.remove_price("ETH");

    let quotes = h
        .collaterals
        .preview_collateral(dec!(100), FiatCurrency::Ngn)
        .await
        .unwrap();

    assert_eq!(quotes.len(), 2);
    assert!(quotes.iter().all(|q| q.asset_symbol != AssetSymbol::Eth));
    assert!(quotes.iter().all(|q| q.fiat_currency == FiatCurrency::Ngn));
    assert_eq!(quotes[0].required_amount, dec!(0.01));
}

#[tokio::test]
async fn test_preview_rejects_bad_input_and_oracle_outage() {
    let h = harness();

    let err = h
        .collaterals
        .preview_collateral(Decimal::ZERO, FiatCurrency::Usd)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    h.oracle.set_unavailable(true);
    let err = h
        .collaterals
        .preview_collateral(dec!(100), FiatCurrency::Usd)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn test_create_request_originates_pending_loan() {
    let h = harness();
    let user = Uuid::new_v4();

    let collateral = h
        .collaterals
        .create_collateral_request(user, dec!(5000), FiatCurrency::Usd, AssetSymbol::Btc)
        .await
        .unwrap();

    assert_eq!(collateral.status, CollateralStatus::Pending);
    assert_eq!(collateral.asset_amount, dec!(0.5));
    assert_eq!(collateral.required_value, dec!(10000));
    assert_eq!(collateral.fiat_amount, dec!(5000));
    assert!(collateral.tx_hash.is_none());

    let loan_id = collateral.loan_request_id.expect("loan linked");
    let loan = h.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.collateral_id, collateral.id);
    assert_eq!(loan.amount_requested, dec!(5000));
    assert_eq!(loan.principal_outstanding, Decimal::ZERO);
}

#[tokio::test]
async fn test_create_request_survives_loan_origination_failure() {
    let h = harness();
    h.store.fail_loan_writes(true);

    let collateral = h
        .collaterals
        .create_collateral_request(Uuid::new_v4(), dec!(100), FiatCurrency::Usd, AssetSymbol::Eth)
        .await
        .unwrap();

    assert!(collateral.loan_request_id.is_none());
    assert_eq!(h.store.collateral_count().await, 1);
    assert_eq!(h.store.loan_count().await, 0);
}

#[tokio::test]
async fn test_verify_activates_pending_request() {
    let h = harness();
    let user = Uuid::new_v4();
    let pending = h
        .collaterals
        .create_collateral_request(user, dec!(5000), FiatCurrency::Usd, AssetSymbol::Btc)
        .await
        .unwrap();

    let active = h
        .collaterals
        .verify_collateral(user, pending.id, "0xdeposit", Some("0xwallet"))
        .await
        .unwrap();

    assert_eq!(active.status, CollateralStatus::Active);
    assert_eq!(active.tx_hash.as_deref(), Some("0xdeposit"));
    assert_eq!(active.wallet_address.as_deref(), Some("0xwallet"));
    assert!(active.verified_at.is_some());

    // Already active
    let err = h
        .collaterals
        .verify_collateral(user, pending.id, "0xother", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_verify_rejections_leave_request_pending() {
    let h = harness();
    let user = Uuid::new_v4();
    let pending = h
        .collaterals
        .create_collateral_request(user, dec!(5000), FiatCurrency::Usd, AssetSymbol::Btc)
        .await
        .unwrap();

    h.verifier.reject("0xbad", "amount mismatch");
    let err = h
        .collaterals
        .verify_collateral(user, pending.id, "0xbad", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VerificationFailed);

    let err = h
        .collaterals
        .verify_collateral(Uuid::new_v4(), pending.id, "0xgood", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let stored = h.collaterals.get_collateral(user, pending.id).await.unwrap();
    assert_eq!(stored.status, CollateralStatus::Pending);
    assert!(stored.tx_hash.is_none());
}

#[tokio::test]
async fn test_lock_persists_active_collateral() {
    let h = harness();
    let user = Uuid::new_v4();

    let collateral = h
        .collaterals
        .lock_collateral(
            user,
            AssetSymbol::Btc,
            "0xlock",
            dec!(0.5),
            Some("0xwallet".to_string()),
            FiatCurrency::Usd,
        )
        .await
        .unwrap();

    assert_eq!(collateral.status, CollateralStatus::Active);
    assert_eq!(collateral.asset_value, dec!(10000));
    assert_eq!(collateral.fiat_amount, dec!(5000));
    assert_eq!(collateral.tx_hash.as_deref(), Some("0xlock"));
    assert!(collateral.loan_request_id.is_none());
    assert_eq!(h.store.loan_count().await, 0);
}

#[tokio::test]
async fn test_lock_rejected_transaction_persists_nothing() {
    let h = harness();
    h.verifier.reject("0xfake", "transaction not found");

    let err = h
        .collaterals
        .lock_collateral(
            Uuid::new_v4(),
            AssetSymbol::Eth,
            "0xfake",
            dec!(1),
            None,
            FiatCurrency::Usd,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::VerificationFailed);
    assert_eq!(h.store.collateral_count().await, 0);
    // Price is never fetched for a rejected deposit
    assert_eq!(h.oracle.call_count(), 0);
}

#[tokio::test]
async fn test_lock_unreachable_node_is_upstream_failure() {
    let h = harness();
    h.verifier.unreachable("0xslow");

    let err = h
        .collaterals
        .lock_collateral(
            Uuid::new_v4(),
            AssetSymbol::Eth,
            "0xslow",
            dec!(1),
            None,
            FiatCurrency::Usd,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    assert_eq!(h.store.collateral_count().await, 0);
}

#[tokio::test]
async fn test_transaction_cannot_back_two_collaterals() {
    let h = harness();
    let user = Uuid::new_v4();

    h.collaterals
        .lock_collateral(user, AssetSymbol::Eth, "0xonce", dec!(2), None, FiatCurrency::Usd)
        .await
        .unwrap();

    let err = h
        .collaterals
        .lock_collateral(user, AssetSymbol::Eth, "0xonce", dec!(2), None, FiatCurrency::Usd)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let pending = h
        .collaterals
        .create_collateral_request(user, dec!(100), FiatCurrency::Usd, AssetSymbol::Eth)
        .await
        .unwrap();
    let err = h
        .collaterals
        .verify_collateral(user, pending.id, "0xonce", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(h.verifier.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_locks_of_one_transaction() {
    let h = harness();
    let user = Uuid::new_v4();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let collaterals = Arc::clone(&h.collaterals);
            tokio::spawn(async move {
                collaterals
                    .lock_collateral(
                        user,
                        AssetSymbol::Eth,
                        "0xrace",
                        dec!(1),
                        None,
                        FiatCurrency::Usd,
                    )
                    .await
            })
        })
        .collect();

    let mut locked = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => locked += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::InvalidState),
        }
    }
    assert_eq!(locked, 1);
    assert_eq!(h.store.collateral_count().await, 1);
}

#[tokio::test]
async fn test_release_workflow() {
    let h = harness();
    let user = Uuid::new_v4();
    let collateral = h
        .collaterals
        .lock_collateral(user, AssetSymbol::Usdt, "0xusdt", dec!(500), None, FiatCurrency::Usd)
        .await
        .unwrap();

    // Only the owner may ask
    let err = h
        .collaterals
        .request_release(Uuid::new_v4(), collateral.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Nothing to decide yet
    let err = h.collaterals.approve_release(collateral.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let requested = h
        .collaterals
        .request_release(user, collateral.id)
        .await
        .unwrap();
    assert_eq!(requested.status, CollateralStatus::ReleaseRequested);
    assert!(requested.release_requested_at.is_some());

    let rejected = h
        .collaterals
        .reject_release(collateral.id, Some("loan outstanding".to_string()))
        .await
        .unwrap();
    assert_eq!(rejected.status, CollateralStatus::Active);
    assert_eq!(rejected.release_note.as_deref(), Some("loan outstanding"));

    h.collaterals
        .request_release(user, collateral.id)
        .await
        .unwrap();
    let released = h.collaterals.approve_release(collateral.id).await.unwrap();
    assert_eq!(released.status, CollateralStatus::Released);
    assert!(released.release_resolved_at.is_some());

    // Terminal
    let err = h
        .collaterals
        .request_release(user, collateral.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_listing_and_ownership() {
    let h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let first = h
        .collaterals
        .create_collateral_request(alice, dec!(100), FiatCurrency::Usd, AssetSymbol::Btc)
        .await
        .unwrap();
    h.collaterals
        .create_collateral_request(alice, dec!(200), FiatCurrency::Usd, AssetSymbol::Eth)
        .await
        .unwrap();
    h.collaterals
        .create_collateral_request(bob, dec!(300), FiatCurrency::Usd, AssetSymbol::Usdt)
        .await
        .unwrap();

    assert_eq!(h.collaterals.list_user_collaterals(alice).await.unwrap().len(), 2);
    assert_eq!(h.collaterals.list_user_collaterals(bob).await.unwrap().len(), 1);
    assert_eq!(h.collaterals.list_all_collaterals().await.unwrap().len(), 3);

    let err = h.collaterals.get_collateral(bob, first.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = h
        .collaterals
        .get_collateral(alice, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
