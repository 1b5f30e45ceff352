use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;
use tracing::{info, warn};

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::interest::{compute_preclose_amount, PrecloseQuote};
use crate::lifecycle;
use crate::loan::{Loan, LoanFields};
use crate::payments::signature::PaymentVerifier;
use crate::retry::{retry_on_conflict, RetryPolicy};
use crate::store::{commit_with_ledger, LoanStore, TransactionStore};
use crate::transaction::{Transaction, TransactionRequest};
use crate::types::{LoanStatus, TransactionType};

/// validated effect of one payment on one loan, not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPlan {
    pub transaction: Transaction,
    pub fields: LoanFields,
    pub closes_loan: bool,
    pub preclose: Option<PrecloseQuote>,
}

/// committed payment
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub transaction: Transaction,
    pub loan: Loan,
    pub closed: bool,
}

/// validate `request` against `loan` and work out the balance update
///
/// Nothing here touches a store: a rejected payment leaves no trace. The
/// balance cap is checked before the status, so a payment against a loan
/// that was just settled reports the exhausted balance.
pub fn plan_payment(
    loan: &Loan,
    request: &TransactionRequest,
    verifier: &dyn PaymentVerifier,
    preclose_charge: Rate,
    now: DateTime<Utc>,
) -> Result<PaymentPlan> {
    if request.loan_id != loan.id {
        return Err(LendingError::InvalidLoanState {
            message: format!("payment targets {} but loan is {}", request.loan_id, loan.id),
        });
    }
    if !request.transaction_type.is_repayment() {
        return Err(LendingError::UnsupportedTransactionType {
            transaction_type: request.transaction_type,
        });
    }

    // hard cap: no overpayment, no zero or negative payments
    if !request.amount.is_positive() || request.amount > loan.remaining_amount {
        return Err(LendingError::AmountExceedsBalance {
            remaining: loan.remaining_amount,
            requested: request.amount,
        });
    }
    if !loan.status.is_open() {
        return Err(LendingError::InvalidLoanState {
            message: format!("loan {} is {}, payments need active or overdue", loan.loan_number, loan.status),
        });
    }

    let gateway = &request.gateway;
    if !verifier.verify_signature(&gateway.order_id, &gateway.payment_id, &gateway.signature) {
        return Err(LendingError::InvalidSignature {
            order_id: gateway.order_id.clone(),
        });
    }

    let preclose = if request.transaction_type == TransactionType::PrecloseRepayment {
        let quote = compute_preclose_amount(loan, preclose_charge, now)?;
        if request.amount != quote.payoff {
            return Err(LendingError::AmountMismatch {
                expected: quote.payoff,
                provided: request.amount,
            });
        }
        Some(quote)
    } else {
        None
    };

    let paid_amount = loan.paid_amount + request.amount;
    let (remaining_amount, waived_amount) = match preclose {
        // settlement: whatever the payoff does not cover is forgiven
        Some(_) => (Money::ZERO, loan.waived_amount + (loan.remaining_amount - request.amount)),
        None => (loan.remaining_amount - request.amount, loan.waived_amount),
    };

    let closes_loan = remaining_amount.is_zero();
    let status = if closes_loan {
        lifecycle::ensure_transition(loan.status, LoanStatus::Closed)?;
        Some(LoanStatus::Closed)
    } else {
        None
    };

    Ok(PaymentPlan {
        transaction: Transaction::from_request(request, now),
        fields: LoanFields {
            status,
            paid_amount: Some(paid_amount),
            remaining_amount: Some(remaining_amount),
            waived_amount: Some(waived_amount),
            updated_at: Some(now),
            ..Default::default()
        },
        closes_loan,
        preclose,
    })
}

/// applies gateway-confirmed payments to loans
pub struct PaymentReconciler {
    loans: Arc<dyn LoanStore>,
    transactions: Arc<dyn TransactionStore>,
    verifier: Arc<dyn PaymentVerifier>,
    preclose_charge: Rate,
    retry: RetryPolicy,
    time: Arc<SafeTimeProvider>,
}

impl PaymentReconciler {
    pub fn new(
        loans: Arc<dyn LoanStore>,
        transactions: Arc<dyn TransactionStore>,
        verifier: Arc<dyn PaymentVerifier>,
        preclose_charge: Rate,
        retry: RetryPolicy,
        time: Arc<SafeTimeProvider>,
    ) -> Self {
        Self {
            loans,
            transactions,
            verifier,
            preclose_charge,
            retry,
            time,
        }
    }

    /// validate, append to the ledger and update balances as one unit
    ///
    /// A lost race re-reads the loan and re-validates from scratch, so a
    /// second payment of the full balance sees the closed loan and fails.
    pub async fn apply_payment(&self, request: &TransactionRequest) -> Result<PaymentOutcome> {
        retry_on_conflict(&self.retry, "apply_payment", || self.try_apply(request)).await
    }

    async fn try_apply(&self, request: &TransactionRequest) -> Result<PaymentOutcome> {
        let loan = self
            .loans
            .get_by_id(request.loan_id)
            .await?
            .ok_or(LendingError::LoanNotFound { id: request.loan_id })?;

        let now = self.time.now();
        let plan = plan_payment(&loan, request, self.verifier.as_ref(), self.preclose_charge, now)?;

        let (updated, transaction) = commit_with_ledger(
            self.loans.clone(),
            self.transactions.clone(),
            &loan,
            plan.fields,
            plan.transaction,
        )
        .await?;

        if !updated.balance_invariant_holds() {
            warn!(
                loan = %updated.loan_number,
                paid = %updated.paid_amount,
                remaining = %updated.remaining_amount,
                penalty = %updated.penalty_amount,
                "balance invariant violated after payment"
            );
        }

        info!(
            loan = %updated.loan_number,
            amount = %transaction.amount,
            transaction_type = ?transaction.transaction_type,
            remaining = %updated.remaining_amount,
            closed = plan.closes_loan,
            "payment applied"
        );

        Ok(PaymentOutcome {
            transaction,
            loan: updated,
            closed: plan.closes_loan,
        })
    }
}
