use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::decimal::Rate;
use crate::errors::{LendingError, Result};
use crate::interest::{PenaltyAccrual, PenaltyConfig};
use crate::retry::RetryPolicy;

/// lending core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingConfig {
    /// percent of principal charged per penalty increment
    pub late_fee_percent: Decimal,
    /// percent of principal charged once on pre-closure
    pub preclose_charge_percent: Decimal,
    pub penalty_accrual: PenaltyAccrual,
    /// seconds between penalty sweeps
    pub sweep_interval_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            late_fee_percent: dec!(1.5),
            preclose_charge_percent: dec!(1.0),
            penalty_accrual: PenaltyAccrual::PerSweep,
            sweep_interval_secs: 86_400,
            retry: RetryPolicy::default(),
        }
    }
}

impl LendingConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// same as `from_env` with an arbitrary source of variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let late_fee_percent = parse_or("LATE_FEE_PERCENTAGE", &lookup, defaults.late_fee_percent)?;
        let preclose_charge_percent =
            parse_or("PRECLOSE_CHARGE_PERCENTAGE", &lookup, defaults.preclose_charge_percent)?;

        let penalty_accrual = match lookup("PENALTY_ACCRUAL") {
            None => defaults.penalty_accrual,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "per_sweep" => PenaltyAccrual::PerSweep,
                "per_elapsed_day" => PenaltyAccrual::PerElapsedDay,
                other => {
                    return Err(LendingError::InvalidConfiguration {
                        message: format!("PENALTY_ACCRUAL must be per_sweep or per_elapsed_day, got {}", other),
                    })
                }
            },
        };

        let sweep_interval_secs =
            parse_or("PENALTY_SWEEP_INTERVAL_SECS", &lookup, defaults.sweep_interval_secs)?;

        let mut retry = defaults.retry;
        retry.max_attempts = parse_or("CONFLICT_RETRY_ATTEMPTS", &lookup, retry.max_attempts)?;

        let config = Self {
            late_fee_percent,
            preclose_charge_percent,
            penalty_accrual,
            sweep_interval_secs,
            retry,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.late_fee_percent < Decimal::ZERO {
            return Err(invalid("late fee percentage must not be negative"));
        }
        if self.preclose_charge_percent < Decimal::ZERO {
            return Err(invalid("pre-closure charge percentage must not be negative"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(invalid("penalty sweep interval must be at least one second"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("conflict retry attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn late_fee(&self) -> Rate {
        Rate::from_percent(self.late_fee_percent)
    }

    pub fn preclose_charge(&self) -> Rate {
        Rate::from_percent(self.preclose_charge_percent)
    }

    pub fn penalty_config(&self) -> PenaltyConfig {
        PenaltyConfig::new(self.late_fee(), self.penalty_accrual)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn invalid(message: &str) -> LendingError {
    LendingError::InvalidConfiguration {
        message: message.to_string(),
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| LendingError::InvalidConfiguration {
            message: format!("{} has an invalid value: {}", key, raw),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LendingConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, LendingConfig::default());
        assert_eq!(config.late_fee(), Rate::from_percent(dec!(1.5)));
        assert_eq!(config.sweep_interval(), Duration::from_secs(86_400));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let config = LendingConfig::from_lookup(lookup_from(&[
            ("LATE_FEE_PERCENTAGE", "2.25"),
            ("PRECLOSE_CHARGE_PERCENTAGE", "0"),
            ("PENALTY_ACCRUAL", "PER_ELAPSED_DAY"),
            ("PENALTY_SWEEP_INTERVAL_SECS", "3600"),
            ("CONFLICT_RETRY_ATTEMPTS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.late_fee_percent, dec!(2.25));
        assert_eq!(config.preclose_charge_percent, Decimal::ZERO);
        assert_eq!(config.penalty_accrual, PenaltyAccrual::PerElapsedDay);
        assert_eq!(config.sweep_interval_secs, 3600);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_rejects_bad_values() {
        for pairs in [
            [("LATE_FEE_PERCENTAGE", "abc")],
            [("LATE_FEE_PERCENTAGE", "-1")],
            [("PENALTY_ACCRUAL", "hourly")],
            [("PENALTY_SWEEP_INTERVAL_SECS", "0")],
            [("CONFLICT_RETRY_ATTEMPTS", "0")],
        ] {
            let err = LendingConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(matches!(err, LendingError::InvalidConfiguration { .. }), "{:?}", pairs);
        }
    }
}
