//! Repayment waterfall
//!
//! Dues are computed from the loan as it stands before the payment, then the payment
//! is split penalty first, interest second, principal last. Anything left after the
//! principal is cleared is not allocated.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use super::model::{Loan, LoanStatus, RepaymentBreakdown};

/// Outstanding principal at or below this is treated as settled
pub const REPAYMENT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rate parameters the waterfall needs
#[derive(Debug, Clone, Copy)]
pub struct WaterfallTerms {
    pub repayment_frequency_days: i64,
    pub grace_period_days: i64,
    pub penalty_apr: Decimal,
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One month of simple interest on the outstanding principal
pub fn interest_due(principal: Decimal, annual_rate: Decimal) -> Decimal {
    round_cents(principal * annual_rate / Decimal::ONE_HUNDRED / Decimal::from(12))
}

/// Whole days past the end of the grace period, zero if not late
pub fn days_late(next_due: DateTime<Utc>, grace_period_days: i64, now: DateTime<Utc>) -> i64 {
    let grace_end = next_due + Duration::days(grace_period_days);
    if now <= grace_end {
        return 0;
    }
    (now - grace_end).num_days()
}

/// Prior penalty plus daily accrual for every whole day late
pub fn penalty_due(loan: &Loan, terms: &WaterfallTerms, now: DateTime<Utc>) -> Decimal {
    let Some(next_due) = loan.next_due_date else {
        return loan.penalty_accrued;
    };

    let late = days_late(next_due, terms.grace_period_days, now);
    if late <= 0 {
        return loan.penalty_accrued;
    }

    let accrual = loan.principal_outstanding * terms.penalty_apr
        / Decimal::ONE_HUNDRED
        / Decimal::from(365)
        * Decimal::from(late);
    loan.penalty_accrued + round_cents(accrual)
}

/// Split `amount` across the dues; returns the breakdown and the unallocated rest
pub fn allocate(
    amount: Decimal,
    penalty_due: Decimal,
    interest_due: Decimal,
    principal_outstanding: Decimal,
) -> (RepaymentBreakdown, Decimal) {
    let mut remaining = amount;

    let penalty = penalty_due.min(remaining).max(Decimal::ZERO);
    remaining -= penalty;

    let interest = interest_due.min(remaining).max(Decimal::ZERO);
    remaining -= interest;

    let principal = principal_outstanding.min(remaining).max(Decimal::ZERO);
    remaining -= principal;

    (
        RepaymentBreakdown {
            principal,
            interest,
            penalty,
        },
        remaining,
    )
}

/// Apply `amount` to a loan carrying principal, mutating it in place
///
/// The caller has already checked ownership and that `amount` is positive.
pub fn apply(
    loan: &mut Loan,
    amount: Decimal,
    terms: &WaterfallTerms,
    now: DateTime<Utc>,
) -> RepaymentBreakdown {
    let interest = interest_due(loan.principal_outstanding, loan.interest_rate);
    let penalty = penalty_due(loan, terms, now);

    let (breakdown, remaining) = allocate(amount, penalty, interest, loan.principal_outstanding);

    loan.penalty_accrued = penalty - breakdown.penalty;
    loan.principal_outstanding -= breakdown.principal;
    loan.total_repaid += amount - remaining;
    loan.last_payment_at = Some(now);
    loan.updated_at = now;

    if loan.principal_outstanding <= REPAYMENT_EPSILON {
        loan.principal_outstanding = Decimal::ZERO;
        loan.status = LoanStatus::Repaid;
        loan.next_due_date = None;
    } else {
        loan.next_due_date = Some(now + Duration::days(terms.repayment_frequency_days));
        loan.status = if loan.penalty_accrued > Decimal::ZERO {
            LoanStatus::Delinquent
        } else {
            LoanStatus::Active
        };
    }

    breakdown
}
