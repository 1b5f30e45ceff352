use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::calendar::days_elapsed;
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::loan::Loan;
use crate::types::InterestType;

/// payoff owed to settle a daily loan early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecloseQuote {
    pub payoff: Money,
    pub interest_accrued: Money,
    pub preclose_charge: Money,
    pub days_elapsed: i64,
    /// payoff would have been negative and was clamped to zero
    pub anomaly: bool,
}

/// compute the pre-closure payoff of `loan` as of `as_of`
///
/// Interest accrues on principal for whole elapsed days only, then a one-off
/// charge of `preclose_charge` percent of principal is added and everything
/// already paid is deducted. Intermediate values stay unrounded; the payoff is
/// rounded to cents once.
pub fn compute_preclose_amount(
    loan: &Loan,
    preclose_charge: Rate,
    as_of: DateTime<Utc>,
) -> Result<PrecloseQuote> {
    let terms = loan.terms.as_ref().ok_or_else(|| LendingError::InvalidLoanState {
        message: format!("loan {} has no approved terms", loan.loan_number),
    })?;

    if terms.interest_type != InterestType::Daily {
        return Err(LendingError::PrecloseNotAllowed {
            reason: format!("{} interest loans cannot be pre-closed", terms.interest_type),
        });
    }

    let (start, end) = match (loan.start_date, loan.end_date) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(LendingError::InvalidLoanState {
                message: format!("loan {} has not been disbursed", loan.loan_number),
            })
        }
    };

    if as_of > end {
        return Err(LendingError::PrecloseNotAllowed {
            reason: format!("loan matured on {}", end.format("%Y-%m-%d")),
        });
    }

    let days = days_elapsed(start, as_of);
    if days < 0 {
        return Err(LendingError::InvalidLoanState {
            message: format!("quote date precedes start date {}", start.format("%Y-%m-%d")),
        });
    }

    let principal = terms.principal_amount;
    let raw_interest = terms.interest_rate.raw_portion_of(principal) * Decimal::from(days);
    let raw_charge = preclose_charge.raw_portion_of(principal);
    let raw_payoff =
        principal.as_decimal() + raw_interest + raw_charge - loan.paid_amount.as_decimal();

    let payoff = Money::from_decimal(raw_payoff);
    let anomaly = payoff.is_negative();
    if anomaly {
        error!(
            loan = %loan.loan_number,
            paid = %loan.paid_amount,
            payoff = %payoff,
            "pre-close payoff went negative, paid amount exceeds payoff"
        );
    }

    Ok(PrecloseQuote {
        payoff: payoff.max(Money::ZERO),
        interest_accrued: Money::from_decimal(raw_interest),
        preclose_charge: Money::from_decimal(raw_charge),
        days_elapsed: days,
        anomaly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::ApprovedTerms;
    use crate::types::LoanStatus;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use std::io;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    fn disbursed_loan(interest_type: InterestType, start: DateTime<Utc>) -> Loan {
        let mut loan = Loan::new(Uuid::new_v4(), Uuid::new_v4(), Money::from_major(10_000), 30, start);
        loan.terms = Some(ApprovedTerms {
            principal_amount: Money::from_major(10_000),
            tenure_days: 30,
            interest_type,
            interest_rate: Rate::from_percent(dec!(1)),
            total_interest: Money::from_major(3_000),
            total_amount_payable: Money::from_major(13_000),
        });
        loan.start_date = Some(start);
        loan.end_date = Some(start + Duration::days(30));
        loan.remaining_amount = Money::from_major(13_000);
        loan.status = LoanStatus::Active;
        loan
    }

    #[test]
    fn test_payoff_after_twenty_days() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let mut loan = disbursed_loan(InterestType::Daily, start);
        loan.paid_amount = Money::from_major(1_500);
        loan.remaining_amount = Money::from_major(11_500);

        let quote = compute_preclose_amount(
            &loan,
            Rate::from_percent(dec!(1)),
            start + Duration::days(20) + Duration::hours(3),
        )
        .unwrap();

        assert_eq!(quote.days_elapsed, 20);
        assert_eq!(quote.interest_accrued, Money::from_major(2_000));
        assert_eq!(quote.preclose_charge, Money::from_major(100));
        assert_eq!(quote.payoff, Money::from_major(10_000 + 2_000 + 100 - 1_500));
        assert!(!quote.anomaly);
    }

    #[test]
    fn test_payoff_on_start_day() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let loan = disbursed_loan(InterestType::Daily, start);

        let quote = compute_preclose_amount(&loan, Rate::from_percent(dec!(1)), start).unwrap();
        assert_eq!(quote.days_elapsed, 0);
        assert_eq!(quote.payoff, Money::from_major(10_100));
    }

    #[test]
    fn test_payoff_rounds_once_to_cents() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut loan = disbursed_loan(InterestType::Daily, start);
        if let Some(terms) = loan.terms.as_mut() {
            terms.principal_amount = Money::from_str_exact("3333.33").unwrap();
            terms.interest_rate = Rate::from_percent(dec!(0.333));
        }

        // 3333.33 * 0.333% * 3 = 33.29996... ; charge 3333.33 * 0.5% = 16.66665
        let quote = compute_preclose_amount(
            &loan,
            Rate::from_percent(dec!(0.5)),
            start + Duration::days(3),
        )
        .unwrap();

        assert_eq!(quote.payoff, Money::from_str_exact("3383.30").unwrap());
    }

    #[test]
    fn test_flat_loans_cannot_preclose() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let loan = disbursed_loan(InterestType::Flat, start);

        let err = compute_preclose_amount(&loan, Rate::from_percent(dec!(1)), start + Duration::days(5))
            .unwrap_err();
        assert!(matches!(err, LendingError::PrecloseNotAllowed { .. }));
    }

    #[test]
    fn test_matured_loans_cannot_preclose() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let loan = disbursed_loan(InterestType::Daily, start);
        let end = loan.end_date.unwrap();

        assert!(compute_preclose_amount(&loan, Rate::from_percent(dec!(1)), end).is_ok());

        let err = compute_preclose_amount(&loan, Rate::from_percent(dec!(1)), end + Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, LendingError::PrecloseNotAllowed { .. }));
    }

    #[test]
    fn test_quote_before_start_is_invalid_state() {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let loan = disbursed_loan(InterestType::Daily, start);

        let err = compute_preclose_amount(&loan, Rate::from_percent(dec!(1)), start - Duration::hours(2))
            .unwrap_err();
        assert!(matches!(err, LendingError::InvalidLoanState { .. }));
    }

    #[test]
    fn test_overpaid_loan_clamps_to_zero() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut loan = disbursed_loan(InterestType::Daily, start);
        loan.paid_amount = Money::from_major(12_000);

        let quote = compute_preclose_amount(&loan, Rate::from_percent(dec!(1)), start + Duration::days(2))
            .unwrap();
        assert_eq!(quote.payoff, Money::ZERO);
        assert!(quote.anomaly);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_clamped_payoff_is_logged() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut loan = disbursed_loan(InterestType::Daily, start);
        loan.paid_amount = Money::from_major(12_000);

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let quote = tracing::subscriber::with_default(subscriber, || {
            compute_preclose_amount(&loan, Rate::from_percent(dec!(1)), start + Duration::days(2)).unwrap()
        });
        assert!(quote.anomaly);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ERROR"), "{}", output);
        assert!(output.contains(&loan.loan_number), "{}", output);
    }

    #[test]
    fn test_undisbursed_loan_is_invalid_state() {
        let now = Utc::now();
        let loan = Loan::new(Uuid::new_v4(), Uuid::new_v4(), Money::from_major(1_000), 10, now);

        let err = compute_preclose_amount(&loan, Rate::from_percent(dec!(1)), now).unwrap_err();
        assert!(matches!(err, LendingError::InvalidLoanState { .. }));
    }
}
