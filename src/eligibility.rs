use chrono::{DateTime, Months, Utc};

use crate::config::LoanConfig;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::{EligibilityBracket, TransactionRecord};

/// outcome of a passed eligibility evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityOutcome {
    /// cap of the bracket the inflow mapped into
    pub max_principal: Money,
    /// summed transaction amounts inside the lookback window
    pub inflow: Money,
    /// transactions that fell inside the window
    pub transactions_considered: u32,
    pub bracket: EligibilityBracket,
}

/// score a loan application against the customer's recent activity
///
/// Pure and deterministic: filters the transactions to the lookback window,
/// requires a minimum count, sums the inflow, maps it to a bracket (boundary
/// inclusive of the lower bracket) and checks the requested principal against
/// the bracket cap. Refusals surface as `InsufficientActivity` or
/// `ExceedsEligibility`. The duplicate-outstanding-loan rule is a separate
/// precondition owned by the lifecycle service.
pub fn evaluate(
    transactions: &[TransactionRecord],
    requested_principal: Money,
    now: DateTime<Utc>,
    config: &LoanConfig,
) -> Result<EligibilityOutcome> {
    let window_start = now
        .checked_sub_months(Months::new(config.lookback_months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let recent: Vec<&TransactionRecord> = transactions
        .iter()
        .filter(|t| t.timestamp >= window_start)
        .collect();

    let found = recent.len() as u32;
    if found < config.min_transactions {
        return Err(LoanError::InsufficientActivity {
            required: config.min_transactions,
            found,
            lookback_months: config.lookback_months,
        });
    }

    let inflow = recent
        .iter()
        .fold(Money::ZERO, |acc, t| acc + t.amount);

    let bracket = config.bracket_for(inflow);
    let max_principal = config.cap_for(bracket);

    if requested_principal > max_principal {
        return Err(LoanError::ExceedsEligibility {
            max_principal,
            requested: requested_principal,
        });
    }

    Ok(EligibilityOutcome {
        max_principal,
        inflow,
        transactions_considered: found,
        bracket,
    })
}
