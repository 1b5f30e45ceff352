use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LendingError;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a borrower or staff user
pub type UserId = Uuid;

/// unique identifier for a disbursement/repayment bank account
pub type BankId = Uuid;

/// unique identifier for a ledger entry
pub type TransactionId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// created by the borrower, not yet submitted
    Requested,
    /// submitted for staff review
    Applied,
    /// terms set by staff, awaiting disbursement
    Approved,
    /// disbursed and performing
    Active,
    /// end date passed with a balance outstanding
    Overdue,
    /// fully repaid or pre-closed
    Closed,
    /// rejected by staff
    Rejected,
}

impl LoanStatus {
    /// no transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Closed | LoanStatus::Rejected)
    }

    /// disbursed and not yet settled
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Requested => "requested",
            LoanStatus::Applied => "applied",
            LoanStatus::Approved => "approved",
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Closed => "closed",
            LoanStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// how interest is charged over the tenure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestType {
    /// one percentage of principal for the whole tenure
    Flat,
    /// a per-day percentage of principal
    Daily,
}

impl InterestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestType::Flat => "flat",
            InterestType::Daily => "daily",
        }
    }
}

impl fmt::Display for InterestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterestType {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(InterestType::Flat),
            "daily" => Ok(InterestType::Daily),
            other => Err(LendingError::InvalidTerms {
                field: "interest_type",
                reason: format!("'{}' is not one of flat, daily", other),
            }),
        }
    }
}

/// ledger entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Disbursement,
    Repayment,
    PrecloseRepayment,
}

impl TransactionType {
    /// money flowing from the borrower back to the lender
    pub fn is_repayment(&self) -> bool {
        matches!(self, TransactionType::Repayment | TransactionType::PrecloseRepayment)
    }
}

/// audience of an emitted domain event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// shown to the borrower
    Notification,
    /// audit trail only
    Activity,
}
