//! Loan service: the entry points a transport layer calls.
//!
//! Every mutation follows the same shape: read the loan, let a pure function
//! from [`lifecycle`] or [`payments`] decide the patch, commit it with the
//! version that was read, and retry the whole thing on a version conflict.
//! Events go out only after the commit succeeded.
//!
//! [`lifecycle`]: crate::lifecycle
//! [`payments`]: crate::payments

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::LendingConfig;
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::events::{DomainEvent, EventNotifier};
use crate::interest::{compute_preclose_amount, PrecloseQuote, TermsRequest};
use crate::lifecycle;
use crate::loan::{Loan, LoanFields};
use crate::payments::{PaymentOutcome, PaymentReconciler, PaymentVerifier};
use crate::retry::retry_on_conflict;
use crate::store::{commit_with_ledger, LoanStore, TransactionStore};
use crate::transaction::{Transaction, TransactionRequest};
use crate::types::{BankId, LoanId, NotificationKind, UserId};

/// borrower's initial request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoanRequest {
    pub bank_id: BankId,
    pub requested_amount: Money,
    /// days
    pub requested_tenure: u32,
}

pub struct LendingService {
    loans: Arc<dyn LoanStore>,
    transactions: Arc<dyn TransactionStore>,
    notifier: Arc<dyn EventNotifier>,
    reconciler: PaymentReconciler,
    config: LendingConfig,
    time: Arc<SafeTimeProvider>,
}

impl LendingService {
    pub fn new(
        loans: Arc<dyn LoanStore>,
        transactions: Arc<dyn TransactionStore>,
        verifier: Arc<dyn PaymentVerifier>,
        notifier: Arc<dyn EventNotifier>,
        config: LendingConfig,
        time: Arc<SafeTimeProvider>,
    ) -> Self {
        let reconciler = PaymentReconciler::new(
            loans.clone(),
            transactions.clone(),
            verifier,
            config.preclose_charge(),
            config.retry,
            time.clone(),
        );
        Self {
            loans,
            transactions,
            notifier,
            reconciler,
            config,
            time,
        }
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    /// open a new loan in `requested`
    pub async fn create_loan(&self, user_id: UserId, request: NewLoanRequest) -> Result<Loan> {
        if !request.requested_amount.is_positive() {
            return Err(LendingError::InvalidTerms {
                field: "requested_amount",
                reason: format!("must be positive, got {}", request.requested_amount),
            });
        }
        if request.requested_tenure == 0 {
            return Err(LendingError::InvalidTerms {
                field: "requested_tenure",
                reason: "must be at least one day".to_string(),
            });
        }

        let loan = Loan::new(
            user_id,
            request.bank_id,
            request.requested_amount,
            request.requested_tenure,
            self.now(),
        );
        let loan = self.loans.create(loan).await?;

        info!(loan = %loan.loan_number, user = %user_id, amount = %loan.requested_amount, "loan requested");
        self.notifier.emit(
            user_id,
            NotificationKind::Activity,
            DomainEvent::LoanRequested {
                loan_id: loan.id,
                loan_number: loan.loan_number.clone(),
                requested_amount: loan.requested_amount,
                timestamp: loan.created_at,
            },
        );
        Ok(loan)
    }

    /// borrower submits their own loan for review
    pub async fn apply(&self, loan_id: LoanId, user_id: UserId) -> Result<Loan> {
        let (_, loan) = self
            .transition("apply", loan_id, |loan, now| {
                if loan.user_id != user_id {
                    return Err(LendingError::NotLoanOwner { loan_id, user_id });
                }
                lifecycle::apply(loan, now)
            })
            .await?;

        self.notifier.emit(
            loan.user_id,
            NotificationKind::Activity,
            DomainEvent::LoanApplied {
                loan_id: loan.id,
                loan_number: loan.loan_number.clone(),
                timestamp: loan.updated_at,
            },
        );
        Ok(loan)
    }

    /// staff fixes the terms: applied -> approved
    pub async fn review(&self, loan_id: LoanId, terms: TermsRequest) -> Result<Loan> {
        let (_, loan) = self
            .transition("review", loan_id, |loan, now| lifecycle::review(loan, &terms, now))
            .await?;

        info!(loan = %loan.loan_number, total_payable = %loan.total_amount_payable(), "loan approved");
        self.notifier.emit(
            loan.user_id,
            NotificationKind::Notification,
            DomainEvent::LoanApproved {
                loan_id: loan.id,
                principal: terms.principal,
                total_amount_payable: loan.total_amount_payable(),
                timestamp: loan.updated_at,
            },
        );
        Ok(loan)
    }

    /// staff releases funds: approved -> active, with the disbursement entry
    pub async fn approve(&self, loan_id: LoanId) -> Result<(Loan, Transaction)> {
        let (loan, disbursement) = retry_on_conflict(&self.config.retry, "approve", || async move {
            let loan = self.get_loan(loan_id).await?;
            let activation = lifecycle::activate(&loan, self.now())?;
            commit_with_ledger(
                self.loans.clone(),
                self.transactions.clone(),
                &loan,
                activation.fields,
                activation.disbursement,
            )
            .await
        })
        .await?;

        self.check_invariant(&loan);
        info!(
            loan = %loan.loan_number,
            amount = %disbursement.amount,
            remaining = %loan.remaining_amount,
            "loan disbursed"
        );
        if let Some(end_date) = loan.end_date {
            self.notifier.emit(
                loan.user_id,
                NotificationKind::Notification,
                DomainEvent::LoanDisbursed {
                    loan_id: loan.id,
                    transaction_id: disbursement.id,
                    amount: disbursement.amount,
                    end_date,
                    timestamp: disbursement.created_at,
                },
            );
        }
        Ok((loan, disbursement))
    }

    pub async fn reject(&self, loan_id: LoanId, reason: &str) -> Result<Loan> {
        let (before, loan) = self
            .transition("reject", loan_id, |loan, now| lifecycle::reject(loan, reason, now))
            .await?;

        info!(loan = %loan.loan_number, previous = %before.status, reason = reason.trim(), "loan rejected");
        self.notifier.emit(
            loan.user_id,
            NotificationKind::Notification,
            DomainEvent::LoanRejected {
                loan_id: loan.id,
                previous_status: before.status,
                reason: loan.rejection_reason.clone().unwrap_or_default(),
                timestamp: loan.updated_at,
            },
        );
        Ok(loan)
    }

    /// apply a gateway-confirmed repayment or pre-closure
    pub async fn make_payment(&self, request: TransactionRequest) -> Result<PaymentOutcome> {
        let outcome = self.reconciler.apply_payment(&request).await?;
        let loan = &outcome.loan;
        self.check_invariant(loan);

        self.notifier.emit(
            loan.user_id,
            NotificationKind::Notification,
            DomainEvent::PaymentReceived {
                loan_id: loan.id,
                transaction_id: outcome.transaction.id,
                transaction_type: outcome.transaction.transaction_type,
                amount: outcome.transaction.amount,
                remaining_amount: loan.remaining_amount,
                timestamp: outcome.transaction.created_at,
            },
        );
        if outcome.closed {
            info!(loan = %loan.loan_number, total_paid = %loan.paid_amount, "loan closed");
            self.notifier.emit(
                loan.user_id,
                NotificationKind::Notification,
                DomainEvent::LoanClosed {
                    loan_id: loan.id,
                    total_paid: loan.paid_amount,
                    timestamp: loan.updated_at,
                },
            );
        }
        Ok(outcome)
    }

    /// amount that would settle the loan right now
    pub async fn preclose_quote(&self, loan_id: LoanId) -> Result<PrecloseQuote> {
        let loan = self.get_loan(loan_id).await?;
        if !loan.status.is_open() {
            return Err(LendingError::InvalidLoanState {
                message: format!("loan {} is {}", loan.loan_number, loan.status),
            });
        }
        compute_preclose_amount(&loan, self.config.preclose_charge(), self.now())
    }

    pub async fn get_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.loans
            .get_by_id(loan_id)
            .await?
            .ok_or(LendingError::LoanNotFound { id: loan_id })
    }

    pub async fn loans_for_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        self.loans.find_by_user(user_id).await
    }

    pub async fn transactions_for_loan(&self, loan_id: LoanId) -> Result<Vec<Transaction>> {
        self.transactions.find_by_loan(loan_id).await
    }

    pub async fn transactions_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.transactions.find_by_user(user_id).await
    }

    /// read, plan, version-checked write; retried on conflict.
    /// Returns the loan as read by the winning attempt and as written.
    async fn transition<F>(&self, operation: &str, loan_id: LoanId, plan: F) -> Result<(Loan, Loan)>
    where
        F: Fn(&Loan, DateTime<Utc>) -> Result<LoanFields>,
    {
        let plan = &plan;
        retry_on_conflict(&self.config.retry, operation, || async move {
            let loan = self.get_loan(loan_id).await?;
            let fields = plan(&loan, self.now())?;
            let updated = self.loans.update_fields(loan.id, loan.version, fields).await?;
            Ok((loan, updated))
        })
        .await
    }

    fn check_invariant(&self, loan: &Loan) {
        if !loan.balance_invariant_holds() {
            error!(
                loan = %loan.loan_number,
                paid = %loan.paid_amount,
                remaining = %loan.remaining_amount,
                waived = %loan.waived_amount,
                penalty = %loan.penalty_amount,
                payable = %loan.total_amount_payable(),
                "balance invariant violated"
            );
        }
    }
}
