use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{add_days, days_elapsed};
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::lifecycle;
use crate::loan::{Loan, LoanFields};

/// how many late-fee increments a sweep adds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyAccrual {
    /// one increment per sweep run, however long since the previous run
    #[default]
    PerSweep,
    /// one increment per whole day since the last penalty (or since maturity)
    PerElapsedDay,
}

/// penalty configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// percent of principal charged per increment
    pub late_fee: Rate,
    pub accrual: PenaltyAccrual,
}

impl PenaltyConfig {
    pub fn new(late_fee: Rate, accrual: PenaltyAccrual) -> Self {
        Self { late_fee, accrual }
    }
}

/// penalty applied to one loan by one sweep
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyAssessment {
    pub increment: Money,
    pub periods: i64,
    pub fields: LoanFields,
}

/// engine for calculating late-fee penalties
pub struct PenaltyEngine {
    pub config: PenaltyConfig,
}

impl PenaltyEngine {
    pub fn new(config: PenaltyConfig) -> Self {
        Self { config }
    }

    /// late fee for a single increment
    pub fn increment_for(&self, principal: Money) -> Money {
        self.config.late_fee.of(principal)
    }

    /// penalty due on `loan` at `now`, or `None` when nothing should be charged
    pub fn assess(&self, loan: &Loan, now: DateTime<Utc>) -> Result<Option<PenaltyAssessment>> {
        if !loan.is_past_due(now) {
            return Ok(None);
        }
        let principal = match loan.principal() {
            Some(p) => p,
            None => return Ok(None),
        };

        let (periods, charged_through) = match self.config.accrual {
            PenaltyAccrual::PerSweep => (1, now),
            PenaltyAccrual::PerElapsedDay => {
                let since = loan.last_penalty_applied_at.or(loan.end_date).unwrap_or(now);
                let days = days_elapsed(since, now);
                // the partial day carries over to the next sweep
                (days, add_days(since, days.max(0) as u32))
            }
        };
        if periods <= 0 {
            return Ok(None);
        }

        let increment = self.increment_for(principal).times(periods);
        if increment.is_zero() {
            return Ok(None);
        }

        let fields = lifecycle::mark_overdue(loan, increment, charged_through, now)?;
        Ok(Some(PenaltyAssessment {
            increment,
            periods,
            fields,
        }))
    }
}
