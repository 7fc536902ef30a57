use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::EligibilityBracket;

/// loan servicing configuration
///
/// Injected as an immutable snapshot per desk; loans copy the per-day
/// penalty rate at creation so later changes never retouch existing loans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanConfig {
    /// one-shot term interest applied to the principal at application time
    pub base_interest_rate: Rate,
    /// daily penalty fraction charged on the overdue installment
    pub penalty_percent_per_day: Rate,
    /// minimum number of transactions inside the lookback window
    pub min_transactions: u32,
    /// eligibility lookback window in calendar months
    pub lookback_months: u32,
    /// cron expression driving the daily penalty sweep
    pub penalty_cron: String,
    /// inflow at or below this maps to the low bracket
    pub low_bracket_max: Money,
    /// inflow at or below this (and above low) maps to the medium bracket
    pub medium_bracket_max: Money,
    pub low_max_loan: Money,
    pub medium_max_loan: Money,
    pub high_max_loan: Money,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            base_interest_rate: Rate::from_decimal(dec!(0.30)),
            penalty_percent_per_day: Rate::from_decimal(dec!(0.05)),
            min_transactions: 5,
            lookback_months: 3,
            penalty_cron: "0 0 0 * * *".to_string(),
            low_bracket_max: Money::from_major(1_000),
            medium_bracket_max: Money::from_major(10_000),
            low_max_loan: Money::from_major(500),
            medium_max_loan: Money::from_major(5_000),
            high_max_loan: Money::from_major(50_000),
        }
    }
}

impl LoanConfig {
    /// check internal consistency before a desk is built around the snapshot
    pub fn validate(&self) -> Result<()> {
        if self.base_interest_rate.as_decimal().is_sign_negative() {
            return Err(LoanError::Validation {
                message: "base interest rate must not be negative".to_string(),
            });
        }
        if self.penalty_percent_per_day.as_decimal().is_sign_negative() {
            return Err(LoanError::Validation {
                message: "penalty percent per day must not be negative".to_string(),
            });
        }
        if self.lookback_months == 0 {
            return Err(LoanError::Validation {
                message: "lookback window must cover at least one month".to_string(),
            });
        }
        if self.low_bracket_max >= self.medium_bracket_max {
            return Err(LoanError::Validation {
                message: "bracket boundaries must be strictly increasing".to_string(),
            });
        }
        if !self.low_max_loan.is_positive()
            || !self.medium_max_loan.is_positive()
            || !self.high_max_loan.is_positive()
        {
            return Err(LoanError::Validation {
                message: "per-bracket loan caps must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// map a customer's window inflow to its bracket; boundaries are
    /// inclusive of the lower bracket
    pub fn bracket_for(&self, inflow: Money) -> EligibilityBracket {
        if inflow <= self.low_bracket_max {
            EligibilityBracket::Low
        } else if inflow <= self.medium_bracket_max {
            EligibilityBracket::Medium
        } else {
            EligibilityBracket::High
        }
    }

    /// maximum principal permitted for a bracket
    pub fn cap_for(&self, bracket: EligibilityBracket) -> Money {
        match bracket {
            EligibilityBracket::Low => self.low_max_loan,
            EligibilityBracket::Medium => self.medium_max_loan,
            EligibilityBracket::High => self.high_max_loan,
        }
    }
}
