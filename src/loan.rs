use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::types::{BankId, InterestType, LoanId, LoanStatus, UserId};

/// terms fixed by staff at review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedTerms {
    pub principal_amount: Money,
    pub tenure_days: u32,
    pub interest_type: InterestType,
    pub interest_rate: Rate,
    pub total_interest: Money,
    pub total_amount_payable: Money,
}

/// loan record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    // identification
    pub id: LoanId,
    pub loan_number: String,
    pub user_id: UserId,
    pub bank_id: BankId,

    // what the borrower asked for
    pub requested_amount: Money,
    pub requested_tenure: u32,

    // set once, at approval
    pub terms: Option<ApprovedTerms>,

    // set on disbursement
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    // running balances
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub penalty_amount: Money,
    /// interest forgiven when a daily loan is pre-closed
    pub waived_amount: Money,
    pub last_penalty_applied_at: Option<DateTime<Utc>>,

    // status
    pub status: LoanStatus,
    pub rejection_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// optimistic concurrency token, bumped by the store on every update
    pub version: u64,
}

impl Loan {
    /// new loan in `requested`
    pub fn new(
        user_id: UserId,
        bank_id: BankId,
        requested_amount: Money,
        requested_tenure: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_number: generate_loan_number(),
            user_id,
            bank_id,
            requested_amount,
            requested_tenure,
            terms: None,
            start_date: None,
            end_date: None,
            paid_amount: Money::ZERO,
            remaining_amount: Money::ZERO,
            penalty_amount: Money::ZERO,
            waived_amount: Money::ZERO,
            last_penalty_applied_at: None,
            status: LoanStatus::Requested,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn principal(&self) -> Option<Money> {
        self.terms.as_ref().map(|t| t.principal_amount)
    }

    pub fn total_amount_payable(&self) -> Money {
        self.terms
            .as_ref()
            .map(|t| t.total_amount_payable)
            .unwrap_or(Money::ZERO)
    }

    /// `paid + remaining + waived == payable + penalty` once disbursed
    pub fn balance_invariant_holds(&self) -> bool {
        if self.start_date.is_none() {
            return true;
        }
        self.paid_amount + self.remaining_amount + self.waived_amount
            == self.total_amount_payable() + self.penalty_amount
            && !self.remaining_amount.is_negative()
            && (!self.remaining_amount.is_zero() || self.status == LoanStatus::Closed)
    }

    /// matured with money still owed
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open()
            && self.remaining_amount.is_positive()
            && self.end_date.map(|end| end < now).unwrap_or(false)
    }

    /// get json representation of current state
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }
}

fn generate_loan_number() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("LN-{}", raw[..10].to_uppercase())
}

/// partial update applied by `LoanStore::update_fields`
///
/// `None` leaves a column alone. Nullable columns take `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanFields {
    pub status: Option<LoanStatus>,
    pub terms: Option<Option<ApprovedTerms>>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub paid_amount: Option<Money>,
    pub remaining_amount: Option<Money>,
    pub penalty_amount: Option<Money>,
    pub waived_amount: Option<Money>,
    pub last_penalty_applied_at: Option<Option<DateTime<Utc>>>,
    pub rejection_reason: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LoanFields {
    /// write every populated field onto `loan`; the version is the store's business
    pub fn apply_to(&self, loan: &mut Loan) {
        if let Some(status) = self.status {
            loan.status = status;
        }
        if let Some(terms) = &self.terms {
            loan.terms = terms.clone();
        }
        if let Some(start) = self.start_date {
            loan.start_date = start;
        }
        if let Some(end) = self.end_date {
            loan.end_date = end;
        }
        if let Some(paid) = self.paid_amount {
            loan.paid_amount = paid;
        }
        if let Some(remaining) = self.remaining_amount {
            loan.remaining_amount = remaining;
        }
        if let Some(penalty) = self.penalty_amount {
            loan.penalty_amount = penalty;
        }
        if let Some(waived) = self.waived_amount {
            loan.waived_amount = waived;
        }
        if let Some(at) = self.last_penalty_applied_at {
            loan.last_penalty_applied_at = at;
        }
        if let Some(reason) = &self.rejection_reason {
            loan.rejection_reason = reason.clone();
        }
        if let Some(at) = self.updated_at {
            loan.updated_at = at;
        }
    }

    /// inverse patch: every column this patch touches, restored to its value in `before`
    pub fn reverting(&self, before: &Loan) -> LoanFields {
        LoanFields {
            status: self.status.map(|_| before.status),
            terms: self.terms.as_ref().map(|_| before.terms.clone()),
            start_date: self.start_date.map(|_| before.start_date),
            end_date: self.end_date.map(|_| before.end_date),
            paid_amount: self.paid_amount.map(|_| before.paid_amount),
            remaining_amount: self.remaining_amount.map(|_| before.remaining_amount),
            penalty_amount: self.penalty_amount.map(|_| before.penalty_amount),
            waived_amount: self.waived_amount.map(|_| before.waived_amount),
            last_penalty_applied_at: self.last_penalty_applied_at.map(|_| before.last_penalty_applied_at),
            rejection_reason: self.rejection_reason.as_ref().map(|_| before.rejection_reason.clone()),
            updated_at: self.updated_at.map(|_| before.updated_at),
        }
    }

    /// preview of the loan after this update
    pub fn applied(&self, loan: &Loan) -> Loan {
        let mut next = loan.clone();
        self.apply_to(&mut next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn active_loan() -> Loan {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut loan = Loan::new(Uuid::new_v4(), Uuid::new_v4(), Money::from_major(10_000), 30, now);
        loan.terms = Some(ApprovedTerms {
            principal_amount: Money::from_major(10_000),
            tenure_days: 30,
            interest_type: InterestType::Flat,
            interest_rate: Rate::from_percent(dec!(10)),
            total_interest: Money::from_major(1_000),
            total_amount_payable: Money::from_major(11_000),
        });
        loan.start_date = Some(now);
        loan.end_date = Some(now + chrono::Duration::days(30));
        loan.remaining_amount = Money::from_major(11_000);
        loan.status = LoanStatus::Active;
        loan
    }

    #[test]
    fn test_new_loan_defaults() {
        let now = Utc::now();
        let loan = Loan::new(Uuid::new_v4(), Uuid::new_v4(), Money::from_major(5_000), 15, now);

        assert_eq!(loan.status, LoanStatus::Requested);
        assert!(loan.loan_number.starts_with("LN-"));
        assert_eq!(loan.loan_number.len(), 13);
        assert_eq!(loan.version, 0);
        assert!(loan.terms.is_none());
        assert!(loan.balance_invariant_holds());
    }

    #[test]
    fn test_invariant_tracks_balances() {
        let mut loan = active_loan();
        assert!(loan.balance_invariant_holds());

        loan.paid_amount = Money::from_major(1_000);
        assert!(!loan.balance_invariant_holds());

        loan.remaining_amount = Money::from_major(10_000);
        assert!(loan.balance_invariant_holds());

        loan.penalty_amount = Money::from_major(150);
        loan.remaining_amount += Money::from_major(150);
        assert!(loan.balance_invariant_holds());
    }

    #[test]
    fn test_zero_balance_requires_closed() {
        let mut loan = active_loan();
        loan.paid_amount = Money::from_major(11_000);
        loan.remaining_amount = Money::ZERO;
        assert!(!loan.balance_invariant_holds());

        loan.status = LoanStatus::Closed;
        assert!(loan.balance_invariant_holds());
    }

    #[test]
    fn test_fields_patch_only_touches_populated_fields() {
        let loan = active_loan();
        let patch = LoanFields {
            paid_amount: Some(Money::from_major(500)),
            remaining_amount: Some(Money::from_major(10_500)),
            ..Default::default()
        };

        let next = patch.applied(&loan);
        assert_eq!(next.paid_amount, Money::from_major(500));
        assert_eq!(next.remaining_amount, Money::from_major(10_500));
        assert_eq!(next.status, loan.status);
        assert_eq!(next.terms, loan.terms);
        assert_eq!(next.version, loan.version);
    }

    #[test]
    fn test_reverting_patch_restores_touched_columns() {
        let mut approved = active_loan();
        approved.status = LoanStatus::Approved;
        approved.start_date = None;
        approved.end_date = None;
        approved.remaining_amount = Money::ZERO;

        let activation = LoanFields {
            status: Some(LoanStatus::Active),
            start_date: Some(Some(approved.created_at)),
            end_date: Some(Some(approved.created_at + chrono::Duration::days(30))),
            remaining_amount: Some(Money::from_major(11_000)),
            ..Default::default()
        };
        let active = activation.applied(&approved);
        assert_eq!(active.status, LoanStatus::Active);
        assert!(active.start_date.is_some());

        let undo = activation.reverting(&approved);
        assert_eq!(undo.paid_amount, None);
        assert_eq!(undo.start_date, Some(None));

        let restored = undo.applied(&active);
        assert_eq!(restored, approved);
    }

    #[test]
    fn test_past_due_detection() {
        let loan = active_loan();
        let end = loan.end_date.unwrap();

        assert!(!loan.is_past_due(end));
        assert!(loan.is_past_due(end + chrono::Duration::seconds(1)));

        let mut settled = loan.clone();
        settled.remaining_amount = Money::ZERO;
        assert!(!settled.is_past_due(end + chrono::Duration::days(1)));
    }
}
