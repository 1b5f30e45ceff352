//! Persistence seams the core calls into.
//!
//! The loan row is the only contended resource: `update_fields` must compare
//! `expected_version` with the stored version and apply the patch atomically,
//! failing with [`LendingError::ConcurrentModification`] on mismatch. The
//! transaction ledger is append-only and needs no update locking.
//!
//! [`LendingError::ConcurrentModification`]: crate::errors::LendingError::ConcurrentModification

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, warn};

use crate::errors::{LendingError, Result};
use crate::loan::{Loan, LoanFields};
use crate::transaction::Transaction;
use crate::types::{LoanId, UserId};

pub use memory::{InMemoryLoanStore, InMemoryTransactionStore};

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn create(&self, loan: Loan) -> Result<Loan>;

    async fn get_by_id(&self, id: LoanId) -> Result<Option<Loan>>;

    /// version-checked patch; returns the loan with its new version
    async fn update_fields(&self, id: LoanId, expected_version: u64, fields: LoanFields) -> Result<Loan>;

    /// open loans whose end date is before `now` and still owe money
    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Loan>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn append(&self, tx: Transaction) -> Result<Transaction>;

    async fn find_by_loan(&self, loan_id: LoanId) -> Result<Vec<Transaction>>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>>;
}

/// commit a balance change together with its ledger entry
///
/// The versioned loan update runs first and is the serialization point; the
/// ledger append follows. If the append fails the update is reverted with a
/// second versioned write, so a failed commit leaves the loan as it was. Both
/// run on a detached task, so once started the commit finishes even if the
/// caller stops waiting.
pub async fn commit_with_ledger(
    loans: Arc<dyn LoanStore>,
    transactions: Arc<dyn TransactionStore>,
    loan: &Loan,
    fields: LoanFields,
    entry: Transaction,
) -> Result<(Loan, Transaction)> {
    let loan_id = loan.id;
    let expected_version = loan.version;
    let loan_number = loan.loan_number.clone();
    let undo = fields.reverting(loan);

    let task = tokio::spawn(async move {
        let updated = loans.update_fields(loan_id, expected_version, fields).await?;
        let err = match transactions.append(entry).await {
            Ok(appended) => return Ok((updated, appended)),
            Err(err) => err,
        };

        match loans.update_fields(loan_id, updated.version, undo).await {
            Ok(restored) => warn!(
                loan = %loan_number,
                version = restored.version,
                error = %err,
                "ledger append failed, balance update reverted"
            ),
            Err(revert_err) => error!(
                loan = %loan_number,
                version = updated.version,
                error = %err,
                revert_error = %revert_err,
                "ledger append failed and balance update could not be reverted"
            ),
        }
        Err(err)
    });

    task.await
        .map_err(|join_err| LendingError::store(format!("commit task failed: {}", join_err)))?
}
