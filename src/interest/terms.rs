use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::types::InterestType;

/// terms proposed by staff when reviewing an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsRequest {
    pub principal: Money,
    pub tenure_days: u32,
    pub interest_type: InterestType,
    pub interest_rate: Rate,
}

/// interest and payable totals for a set of terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsCalculation {
    pub total_interest: Money,
    pub total_amount_payable: Money,
}

/// validate inputs and compute total interest and total payable
///
/// `flat` charges `interest_rate` percent of principal once for the whole tenure;
/// `daily` charges it for every day of the tenure. The product is rounded once.
pub fn compute_terms(
    principal: Money,
    tenure_days: u32,
    interest_type: InterestType,
    interest_rate: Rate,
) -> Result<TermsCalculation> {
    if !principal.is_positive() {
        return Err(LendingError::InvalidTerms {
            field: "principal",
            reason: format!("must be greater than zero, got {}", principal),
        });
    }
    if tenure_days == 0 {
        return Err(LendingError::InvalidTerms {
            field: "tenure_days",
            reason: "must be at least one day".to_string(),
        });
    }
    if interest_rate.is_negative() {
        return Err(LendingError::InvalidTerms {
            field: "interest_rate",
            reason: format!("must not be negative, got {}", interest_rate),
        });
    }

    let per_period = interest_rate.raw_portion_of(principal);
    let raw_interest = match interest_type {
        InterestType::Flat => per_period,
        InterestType::Daily => per_period * Decimal::from(tenure_days),
    };
    let total_interest = Money::from_decimal(raw_interest);

    Ok(TermsCalculation {
        total_interest,
        total_amount_payable: principal + total_interest,
    })
}

impl TermsRequest {
    pub fn compute(&self) -> Result<TermsCalculation> {
        compute_terms(self.principal, self.tenure_days, self.interest_type, self.interest_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_daily_terms() {
        let calc = compute_terms(
            Money::from_major(10_000),
            30,
            InterestType::Daily,
            Rate::from_percent(dec!(1)),
        )
        .unwrap();

        assert_eq!(calc.total_interest, Money::from_major(3_000));
        assert_eq!(calc.total_amount_payable, Money::from_major(13_000));
    }

    #[test]
    fn test_flat_terms_ignore_tenure() {
        for tenure in [1, 30, 90, 365] {
            let calc = compute_terms(
                Money::from_major(10_000),
                tenure,
                InterestType::Flat,
                Rate::from_percent(dec!(10)),
            )
            .unwrap();

            assert_eq!(calc.total_interest, Money::from_major(1_000));
            assert_eq!(calc.total_amount_payable, Money::from_major(11_000));
        }
    }

    #[test]
    fn test_fractional_rates_round_to_cents() {
        // 1234.56 * 0.35% * 7 = 30.24672
        let calc = compute_terms(
            Money::from_str_exact("1234.56").unwrap(),
            7,
            InterestType::Daily,
            Rate::from_percent(dec!(0.35)),
        )
        .unwrap();

        assert_eq!(calc.total_interest, Money::from_str_exact("30.25").unwrap());
        assert_eq!(calc.total_amount_payable, Money::from_str_exact("1264.81").unwrap());
    }

    #[test]
    fn test_zero_rate_is_valid() {
        let calc = compute_terms(Money::from_major(500), 10, InterestType::Daily, Rate::ZERO).unwrap();
        assert_eq!(calc.total_interest, Money::ZERO);
        assert_eq!(calc.total_amount_payable, Money::from_major(500));
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let rate = Rate::from_percent(dec!(1));

        let err = compute_terms(Money::ZERO, 30, InterestType::Flat, rate).unwrap_err();
        assert!(matches!(err, LendingError::InvalidTerms { field: "principal", .. }));

        let err = compute_terms(Money::from_major(-5), 30, InterestType::Flat, rate).unwrap_err();
        assert!(matches!(err, LendingError::InvalidTerms { field: "principal", .. }));

        let err = compute_terms(Money::from_major(100), 0, InterestType::Flat, rate).unwrap_err();
        assert!(matches!(err, LendingError::InvalidTerms { field: "tenure_days", .. }));

        let err = compute_terms(
            Money::from_major(100),
            30,
            InterestType::Daily,
            Rate::from_percent(dec!(-0.5)),
        )
        .unwrap_err();
        assert!(matches!(err, LendingError::InvalidTerms { field: "interest_rate", .. }));
    }

    #[test]
    fn test_is_pure() {
        let request = TermsRequest {
            principal: Money::from_major(7_500),
            tenure_days: 45,
            interest_type: InterestType::Daily,
            interest_rate: Rate::from_percent(dec!(0.2)),
        };

        assert_eq!(request.compute().unwrap(), request.compute().unwrap());
    }
}
