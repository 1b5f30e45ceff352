use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{LoanStatus, TransactionType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LendingError {
    #[error("invalid terms: {field} {reason}")]
    InvalidTerms {
        field: &'static str,
        reason: String,
    },

    #[error("invalid transition: loan is {current}, cannot move to {attempted}")]
    InvalidTransition {
        current: LoanStatus,
        attempted: LoanStatus,
    },

    #[error("pre-closure not allowed: {reason}")]
    PrecloseNotAllowed {
        reason: String,
    },

    #[error("invalid loan state: {message}")]
    InvalidLoanState {
        message: String,
    },

    #[error("amount exceeds balance: remaining {remaining}, requested {requested}")]
    AmountExceedsBalance {
        remaining: Money,
        requested: Money,
    },

    #[error("amount mismatch: expected {expected}, provided {provided}")]
    AmountMismatch {
        expected: Money,
        provided: Money,
    },

    #[error("invalid payment signature for order {order_id}")]
    InvalidSignature {
        order_id: String,
    },

    #[error("concurrent modification of loan {loan_id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        loan_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("loan {loan_id} does not belong to user {user_id}")]
    NotLoanOwner {
        loan_id: Uuid,
        user_id: Uuid,
    },

    #[error("transaction type {transaction_type:?} cannot be submitted as a payment")]
    UnsupportedTransactionType {
        transaction_type: TransactionType,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("store failure: {message}")]
    Store {
        message: String,
    },
}

impl LendingError {
    /// only a lost optimistic race is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, LendingError::ConcurrentModification { .. })
    }

    /// infrastructure failure rather than a business-rule violation
    pub fn is_internal(&self) -> bool {
        matches!(self, LendingError::Store { .. })
    }

    pub fn store(message: impl Into<String>) -> Self {
        LendingError::Store {
            message: message.into(),
        }
    }

    /// stable code for whatever transport wraps the core
    pub fn error_code(&self) -> &'static str {
        match self {
            LendingError::InvalidTerms { .. } => "INVALID_TERMS",
            LendingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LendingError::PrecloseNotAllowed { .. } => "PRECLOSE_NOT_ALLOWED",
            LendingError::InvalidLoanState { .. } => "INVALID_LOAN_STATE",
            LendingError::AmountExceedsBalance { .. } => "AMOUNT_EXCEEDS_BALANCE",
            LendingError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            LendingError::InvalidSignature { .. } => "INVALID_SIGNATURE",
            LendingError::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            LendingError::LoanNotFound { .. } => "LOAN_NOT_FOUND",
            LendingError::NotLoanOwner { .. } => "NOT_LOAN_OWNER",
            LendingError::UnsupportedTransactionType { .. } => "UNSUPPORTED_TRANSACTION_TYPE",
            LendingError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            LendingError::Store { .. } => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
