//! Repayment recording, end to end from locked collateral

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::harness;
use loanee_server::error::ErrorKind;
use loanee_server::loan::LoanStatus;
use loanee_server::models::{AssetSymbol, FiatCurrency};
use loanee_server::repayment::{PaymentStatus, RepaymentInput};

fn input(amount: Decimal, currency: FiatCurrency) -> RepaymentInput {
    RepaymentInput {
        amount,
        currency,
        method: Some("bank_transfer".to_string()),
        reference: Some("ref-001".to_string()),
    }
}

#[tokio::test]
async fn test_locked_collateral_to_repaid_loan() {
    let h = harness();
    let user = Uuid::new_v4();

    let collateral = h
        .collaterals
        .lock_collateral(
            user,
            AssetSymbol::Btc,
            "0xbtcdeposit",
            dec!(0.5),
            None,
            FiatCurrency::Usd,
        )
        .await
        .unwrap();
    assert_eq!(collateral.asset_value, dec!(10000));
    assert_eq!(collateral.fiat_amount, dec!(5000));

    let loan = h.loans.create_from_collateral(&collateral).await.unwrap();
    assert_eq!(loan.amount_approved, dec!(5000));

    h.loans.approve_loan(loan.id, None).await.unwrap();
    let loan = h.loans.disburse_loan(loan.id).await.unwrap();
    assert_eq!(loan.principal_outstanding, dec!(5000));

    let result = h
        .repayments
        .record_repayment(user, loan.id, input(dec!(5000), FiatCurrency::Usd))
        .await
        .unwrap();

    assert_eq!(result.loan.status, LoanStatus::Repaid);
    assert_eq!(result.remaining_principal, Decimal::ZERO);
    assert_eq!(result.payment.principal_paid, dec!(5000));
    assert_eq!(result.payment.interest_paid, Decimal::ZERO);
    assert_eq!(result.payment.penalty_paid, Decimal::ZERO);
    assert_eq!(result.payment.status, PaymentStatus::Completed);
    assert_eq!(result.payment.method.as_deref(), Some("bank_transfer"));
    assert_eq!(result.payment.reference.as_deref(), Some("ref-001"));

    let payments = h.repayments.list_repayments(user, loan.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].id, result.payment.id);
}

#[tokio::test]
async fn test_payment_keeps_full_amount_and_currency() {
    let h = harness();
    let user = Uuid::new_v4();
    let collateral = h
        .collaterals
        .lock_collateral(user, AssetSymbol::Usdt, "0xusdt", dec!(400), None, FiatCurrency::Ngn)
        .await
        .unwrap();
    let loan = h.loans.create_from_collateral(&collateral).await.unwrap();
    h.loans.approve_loan(loan.id, None).await.unwrap();
    h.loans.disburse_loan(loan.id).await.unwrap();

    let result = h
        .repayments
        .record_repayment(user, loan.id, input(dec!(250), FiatCurrency::Ngn))
        .await
        .unwrap();

    // 200 outstanding; the extra 50 is not allocated
    assert_eq!(result.payment.amount, dec!(250));
    assert_eq!(result.payment.principal_paid, dec!(200));
    assert_eq!(result.payment.currency, FiatCurrency::Ngn);
    assert_eq!(result.loan.total_repaid, dec!(200));
    assert_eq!(result.loan.status, LoanStatus::Repaid);
}

#[tokio::test]
async fn test_repayment_on_repaid_loan_still_records_payment() {
    let h = harness();
    let user = Uuid::new_v4();
    let collateral = h
        .collaterals
        .lock_collateral(user, AssetSymbol::Eth, "0xeth", dec!(1), None, FiatCurrency::Usd)
        .await
        .unwrap();
    let loan = h.loans.create_from_collateral(&collateral).await.unwrap();
    h.loans.approve_loan(loan.id, None).await.unwrap();
    h.loans.disburse_loan(loan.id).await.unwrap();

    h.repayments
        .record_repayment(user, loan.id, input(dec!(500), FiatCurrency::Usd))
        .await
        .unwrap();
    let again = h
        .repayments
        .record_repayment(user, loan.id, input(dec!(10), FiatCurrency::Usd))
        .await
        .unwrap();

    assert_eq!(again.loan.status, LoanStatus::Repaid);
    assert_eq!(again.payment.principal_paid, Decimal::ZERO);
    assert_eq!(again.payment.amount, dec!(10));
    assert_eq!(h.store.payment_count().await, 2);
}

#[tokio::test]
async fn test_repayment_in_other_currency_is_rejected() {
    let h = harness();
    let user = Uuid::new_v4();
    let collateral = h
        .collaterals
        .lock_collateral(user, AssetSymbol::Btc, "0xbtcusd", dec!(0.5), None, FiatCurrency::Usd)
        .await
        .unwrap();
    let loan = h.loans.create_from_collateral(&collateral).await.unwrap();
    assert_eq!(loan.fiat_currency, FiatCurrency::Usd);
    h.loans.approve_loan(loan.id, None).await.unwrap();
    h.loans.disburse_loan(loan.id).await.unwrap();

    let err = h
        .repayments
        .record_repayment(user, loan.id, input(dec!(5000), FiatCurrency::Ngn))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let loan = h.loans.get_loan(loan.id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.principal_outstanding, dec!(5000));
    assert_eq!(loan.total_repaid, Decimal::ZERO);
    assert_eq!(h.store.payment_count().await, 0);
}

#[tokio::test]
async fn test_rejected_repayments_write_nothing() {
    let h = harness();
    let user = Uuid::new_v4();
    let collateral = h
        .collaterals
        .lock_collateral(user, AssetSymbol::Eth, "0xeth2", dec!(1), None, FiatCurrency::Usd)
        .await
        .unwrap();
    let loan = h.loans.create_from_collateral(&collateral).await.unwrap();

    let err = h
        .repayments
        .record_repayment(user, loan.id, input(dec!(-1), FiatCurrency::Usd))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = h
        .repayments
        .record_repayment(Uuid::new_v4(), loan.id, input(dec!(10), FiatCurrency::Usd))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = h
        .repayments
        .record_repayment(user, Uuid::new_v4(), input(dec!(10), FiatCurrency::Usd))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(h.store.payment_count().await, 0);
}

#[tokio::test]
async fn test_payment_write_failure_is_reported() {
    let h = harness();
    let user = Uuid::new_v4();
    let collateral = h
        .collaterals
        .lock_collateral(user, AssetSymbol::Eth, "0xeth3", dec!(1), None, FiatCurrency::Usd)
        .await
        .unwrap();
    let loan = h.loans.create_from_collateral(&collateral).await.unwrap();
    h.loans.approve_loan(loan.id, None).await.unwrap();
    h.loans.disburse_loan(loan.id).await.unwrap();

    h.store.fail_payment_writes(true);
    let err = h
        .repayments
        .record_repayment(user, loan.id, input(dec!(100), FiatCurrency::Usd))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceError);

    // The loan update is not rolled back
    let loan = h.loans.get_loan(loan.id).await.unwrap();
    assert_eq!(loan.principal_outstanding, dec!(400));
    assert_eq!(h.store.payment_count().await, 0);
}

#[tokio::test]
async fn test_list_repayments_hides_foreign_loans() {
    let h = harness();
    let user = Uuid::new_v4();
    let collateral = h
        .collaterals
        .lock_collateral(user, AssetSymbol::Eth, "0xeth4", dec!(1), None, FiatCurrency::Usd)
        .await
        .unwrap();
    let loan = h.loans.create_from_collateral(&collateral).await.unwrap();

    assert!(h.repayments.list_repayments(user, loan.id).await.unwrap().is_empty());

    let err = h
        .repayments
        .list_repayments(Uuid::new_v4(), loan.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
