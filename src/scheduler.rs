//! Periodic late-fee sweep.
//!
//! The candidate list from `find_overdue` is only a hint: every loan is
//! re-read and re-assessed inside the conflict-retry loop before its penalty
//! is written, so a repayment racing the sweep either lands first (and the
//! loan is skipped or penalized on its new balance) or forces a retry.

use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::{LendingError, Result};
use crate::events::{DomainEvent, EventNotifier};
use crate::interest::{PenaltyAssessment, PenaltyEngine};
use crate::loan::Loan;
use crate::retry::{retry_on_conflict, RetryPolicy};
use crate::store::LoanStore;
use crate::types::{LoanId, NotificationKind};

/// counts from one sweep run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub examined: usize,
    pub penalized: usize,
    /// no longer due when re-read
    pub skipped: usize,
    pub failed: usize,
}

enum LoanSweep {
    Penalized(Loan, PenaltyAssessment),
    Skipped,
}

pub struct PenaltySweeper {
    loans: Arc<dyn LoanStore>,
    notifier: Arc<dyn EventNotifier>,
    engine: PenaltyEngine,
    retry: RetryPolicy,
    time: Arc<SafeTimeProvider>,
}

impl PenaltySweeper {
    pub fn new(
        loans: Arc<dyn LoanStore>,
        notifier: Arc<dyn EventNotifier>,
        engine: PenaltyEngine,
        retry: RetryPolicy,
        time: Arc<SafeTimeProvider>,
    ) -> Self {
        Self {
            loans,
            notifier,
            engine,
            retry,
            time,
        }
    }

    /// penalize every loan past due at the current time
    ///
    /// Fails only when the candidate list cannot be loaded; per-loan failures
    /// are logged and counted.
    pub async fn run_once(&self) -> Result<SweepSummary> {
        let now = self.time.now();
        let candidates = self.loans.find_overdue(now).await?;
        let mut summary = SweepSummary {
            examined: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            match self.sweep_loan(candidate.id).await {
                Ok(LoanSweep::Penalized(loan, assessment)) => {
                    summary.penalized += 1;
                    info!(
                        loan = %loan.loan_number,
                        increment = %assessment.increment,
                        periods = assessment.periods,
                        penalty_total = %loan.penalty_amount,
                        remaining = %loan.remaining_amount,
                        "penalty applied"
                    );
                    self.notifier.emit(
                        loan.user_id,
                        NotificationKind::Notification,
                        DomainEvent::PenaltyApplied {
                            loan_id: loan.id,
                            amount: assessment.increment,
                            penalty_total: loan.penalty_amount,
                            remaining_amount: loan.remaining_amount,
                            timestamp: loan.updated_at,
                        },
                    );
                }
                Ok(LoanSweep::Skipped) => {
                    summary.skipped += 1;
                    debug!(loan = %candidate.loan_number, "no longer due, skipped");
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(loan = %candidate.loan_number, error = %err, "penalty sweep failed for loan");
                }
            }
        }

        info!(
            examined = summary.examined,
            penalized = summary.penalized,
            skipped = summary.skipped,
            failed = summary.failed,
            "penalty sweep finished"
        );
        Ok(summary)
    }

    async fn sweep_loan(&self, loan_id: LoanId) -> Result<LoanSweep> {
        retry_on_conflict(&self.retry, "penalty_sweep", || async move {
            let loan = match self.loans.get_by_id(loan_id).await? {
                Some(loan) => loan,
                None => return Err(LendingError::LoanNotFound { id: loan_id }),
            };
            let assessment = match self.engine.assess(&loan, self.time.now())? {
                Some(assessment) => assessment,
                None => return Ok(LoanSweep::Skipped),
            };
            let updated = self
                .loans
                .update_fields(loan.id, loan.version, assessment.fields.clone())
                .await?;
            Ok(LoanSweep::Penalized(updated, assessment))
        })
        .await
    }

    /// run a sweep every `interval` until `shutdown` turns true
    ///
    /// The first sweep runs immediately. A sweep in progress is allowed to
    /// finish before the loop stops.
    pub fn spawn(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "penalty sweeper started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = self.run_once().await {
                            warn!(error = %err, "penalty sweep could not load candidates");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("penalty sweeper stopped");
        })
    }
}
