use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::errors::{LendingError, Result};
use crate::loan::{Loan, LoanFields};
use crate::store::{LoanStore, TransactionStore};
use crate::transaction::Transaction;
use crate::types::{LoanId, UserId};

#[derive(Default)]
struct LoanTable {
    rows: HashMap<LoanId, Loan>,
    loan_numbers: HashSet<String>,
}

/// loan store backed by a map; each update holds the write lock for the
/// compare-and-set only, so unrelated loans never wait on I/O
#[derive(Default)]
pub struct InMemoryLoanStore {
    table: RwLock<LoanTable>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn create(&self, loan: Loan) -> Result<Loan> {
        let mut table = self.table.write().await;
        if table.rows.contains_key(&loan.id) {
            return Err(LendingError::store(format!("duplicate loan id {}", loan.id)));
        }
        if !table.loan_numbers.insert(loan.loan_number.clone()) {
            return Err(LendingError::store(format!("duplicate loan number {}", loan.loan_number)));
        }
        table.rows.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn get_by_id(&self, id: LoanId) -> Result<Option<Loan>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn update_fields(&self, id: LoanId, expected_version: u64, fields: LoanFields) -> Result<Loan> {
        let mut table = self.table.write().await;
        let loan = table
            .rows
            .get_mut(&id)
            .ok_or(LendingError::LoanNotFound { id })?;

        if loan.version != expected_version {
            return Err(LendingError::ConcurrentModification {
                loan_id: id,
                expected: expected_version,
                actual: loan.version,
            });
        }

        fields.apply_to(loan);
        loan.version += 1;
        Ok(loan.clone())
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        let table = self.table.read().await;
        let mut overdue: Vec<Loan> = table
            .rows
            .values()
            .filter(|loan| loan.is_past_due(now))
            .cloned()
            .collect();
        overdue.sort_by_key(|loan| loan.end_date);
        Ok(overdue)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        let table = self.table.read().await;
        let mut loans: Vec<Loan> = table
            .rows
            .values()
            .filter(|loan| loan.user_id == user_id)
            .cloned()
            .collect();
        loans.sort_by_key(|loan| loan.created_at);
        Ok(loans)
    }
}

/// append-only ledger kept in insertion order
#[derive(Default)]
pub struct InMemoryTransactionStore {
    ledger: RwLock<Vec<Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.ledger.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ledger.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn append(&self, tx: Transaction) -> Result<Transaction> {
        let mut ledger = self.ledger.write().await;
        if ledger.iter().any(|existing| existing.id == tx.id) {
            return Err(LendingError::store(format!("duplicate transaction id {}", tx.id)));
        }
        ledger.push(tx.clone());
        Ok(tx)
    }

    async fn find_by_loan(&self, loan_id: LoanId) -> Result<Vec<Transaction>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.iter().filter(|tx| tx.loan_id == loan_id).cloned().collect())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.iter().filter(|tx| tx.user_id == user_id).cloned().collect())
    }
}
