//! Loan status transitions and the fields each one writes.
//!
//! Every function here is pure: it validates the move against the current
//! loan and returns the [`LoanFields`] patch to persist. Callers commit the
//! patch through `LoanStore::update_fields` with the version they read.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::calendar::add_days;
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::interest::TermsRequest;
use crate::loan::{ApprovedTerms, Loan, LoanFields};
use crate::transaction::Transaction;
use crate::types::LoanStatus;

/// whether `from -> to` is a legal edge
pub fn can_transition(from: LoanStatus, to: LoanStatus) -> bool {
    use LoanStatus::*;

    match (from, to) {
        (Requested, Applied) => true,
        (Applied, Approved) => true,
        (Approved, Active) => true,
        (Active, Overdue) => true,
        (Active, Closed) | (Overdue, Closed) => true,
        (from, Rejected) => !from.is_terminal(),
        _ => false,
    }
}

pub fn ensure_transition(from: LoanStatus, to: LoanStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(LendingError::InvalidTransition {
            current: from,
            attempted: to,
        })
    }
}

/// borrower submits the request: requested -> applied
pub fn apply(loan: &Loan, now: DateTime<Utc>) -> Result<LoanFields> {
    ensure_transition(loan.status, LoanStatus::Applied)?;
    debug!(loan = %loan.loan_number, "loan submitted for review");

    Ok(LoanFields {
        status: Some(LoanStatus::Applied),
        updated_at: Some(now),
        ..Default::default()
    })
}

/// staff sets the approved terms: applied -> approved
pub fn review(loan: &Loan, request: &TermsRequest, now: DateTime<Utc>) -> Result<LoanFields> {
    ensure_transition(loan.status, LoanStatus::Approved)?;
    let calculation = request.compute()?;

    debug!(
        loan = %loan.loan_number,
        principal = %request.principal,
        interest_type = %request.interest_type,
        total_payable = %calculation.total_amount_payable,
        "terms approved"
    );

    Ok(LoanFields {
        status: Some(LoanStatus::Approved),
        terms: Some(Some(ApprovedTerms {
            principal_amount: request.principal,
            tenure_days: request.tenure_days,
            interest_type: request.interest_type,
            interest_rate: request.interest_rate,
            total_interest: calculation.total_interest,
            total_amount_payable: calculation.total_amount_payable,
        })),
        updated_at: Some(now),
        ..Default::default()
    })
}

/// result of approving disbursement
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub fields: LoanFields,
    pub disbursement: Transaction,
}

/// staff releases funds: approved -> active
pub fn activate(loan: &Loan, now: DateTime<Utc>) -> Result<Activation> {
    ensure_transition(loan.status, LoanStatus::Active)?;
    let terms = loan.terms.as_ref().ok_or_else(|| LendingError::InvalidLoanState {
        message: format!("loan {} is approved without terms", loan.loan_number),
    })?;

    let fields = LoanFields {
        status: Some(LoanStatus::Active),
        start_date: Some(Some(now)),
        end_date: Some(Some(add_days(now, terms.tenure_days))),
        paid_amount: Some(Money::ZERO),
        remaining_amount: Some(terms.total_amount_payable),
        penalty_amount: Some(Money::ZERO),
        waived_amount: Some(Money::ZERO),
        updated_at: Some(now),
        ..Default::default()
    };
    let disbursement = Transaction::disbursement(loan.id, loan.user_id, terms.principal_amount, now);

    Ok(Activation { fields, disbursement })
}

/// scheduler found the loan matured and unpaid: active|overdue -> overdue plus penalty
///
/// `charged_through` becomes the new penalty anchor; it is `now` unless the
/// charge covers whole days only.
pub fn mark_overdue(
    loan: &Loan,
    increment: Money,
    charged_through: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<LoanFields> {
    // re-penalizing an overdue loan keeps the status, it is not an edge
    if loan.status != LoanStatus::Overdue {
        ensure_transition(loan.status, LoanStatus::Overdue)?;
    }

    Ok(LoanFields {
        status: Some(LoanStatus::Overdue),
        penalty_amount: Some(loan.penalty_amount + increment),
        remaining_amount: Some(loan.remaining_amount + increment),
        last_penalty_applied_at: Some(Some(charged_through)),
        updated_at: Some(now),
        ..Default::default()
    })
}

/// staff rejects the loan with a reason: any open status -> rejected
pub fn reject(loan: &Loan, reason: &str, now: DateTime<Utc>) -> Result<LoanFields> {
    ensure_transition(loan.status, LoanStatus::Rejected)?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LendingError::InvalidTerms {
            field: "rejection_reason",
            reason: "must not be empty".to_string(),
        });
    }

    Ok(LoanFields {
        status: Some(LoanStatus::Rejected),
        rejection_reason: Some(Some(reason.to_string())),
        updated_at: Some(now),
        ..Default::default()
    })
}
