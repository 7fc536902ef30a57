use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::types::{AccountId, LoanId, LoanStatus, RepaymentId, RepaymentStatus};

/// a loan record with its monetary state
///
/// Never deleted once created; status moves only forward through the
/// lifecycle (see `LoanStatus`). `outstanding` is decremented by repayments,
/// incremented by accrued penalties, and clamped at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: String,
    pub account_id: AccountId,
    pub principal: Money,
    /// one-shot term interest fraction, e.g. 0.30 = 30%
    pub interest_rate: Rate,
    pub term_days: u32,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
    /// principal + principal * interest_rate, fixed at application time
    pub total_due: Money,
    pub outstanding: Money,
    /// per-day penalty rate snapshot from config at creation; later config
    /// changes never alter this loan
    pub penalty_percent_per_day: Rate,
    /// officer note, or the applicant's stated reason before a decision
    pub remark: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub decided_by: Option<String>,
}

impl Loan {
    /// open a new application in PENDING
    pub fn open(
        customer_id: String,
        account_id: AccountId,
        principal: Money,
        interest_rate: Rate,
        term_days: u32,
        penalty_percent_per_day: Rate,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let start_date = now.date_naive();
        let due_date = start_date + Duration::days(term_days as i64);
        let total_due = principal + principal * interest_rate;

        Self {
            id: Uuid::new_v4(),
            customer_id,
            account_id,
            principal,
            interest_rate,
            term_days,
            start_date,
            due_date,
            status: LoanStatus::Pending,
            total_due,
            outstanding: total_due,
            penalty_percent_per_day,
            remark: reason,
            applied_at: now,
            decided_by: None,
        }
    }

    /// days past the due date; zero on or before it
    pub fn days_overdue(&self, today: NaiveDate) -> u32 {
        (today - self.due_date).num_days().max(0) as u32
    }

    /// true strictly after the due date
    pub fn is_late(&self, today: NaiveDate) -> bool {
        today > self.due_date
    }

    /// add an accrued penalty to the outstanding balance
    pub fn post_penalty(&mut self, amount: Money) {
        self.outstanding += amount;
    }

    /// reduce outstanding by a repayment; clamps at zero and flips the loan
    /// to COMPLETED when settled. Returns true if this payment finished it.
    pub fn apply_payment(&mut self, amount: Money) -> bool {
        let after = self.outstanding - amount;
        if after.is_positive() {
            self.outstanding = after;
            false
        } else {
            self.outstanding = Money::ZERO;
            self.status = LoanStatus::Completed;
            true
        }
    }
}

/// one repayment posting against a loan
///
/// Created at each posting and never deleted; afterwards only the penalty
/// accrual touches it, adding to `penalty_amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repayment {
    pub id: RepaymentId,
    pub loan_id: LoanId,
    /// the account that paid
    pub account_id: AccountId,
    pub amount_paid: Money,
    pub paid_at: DateTime<Utc>,
    pub status: RepaymentStatus,
    pub reference_id: String,
    pub note: Option<String>,
    /// cumulative penalty accrued against this installment
    pub penalty_amount: Money,
}

impl Repayment {
    pub fn new(
        loan_id: LoanId,
        account_id: AccountId,
        amount_paid: Money,
        status: RepaymentStatus,
        reference_id: String,
        note: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            account_id,
            amount_paid,
            paid_at,
            status,
            reference_id,
            note,
            penalty_amount: Money::ZERO,
        }
    }
}

/// reference id for a repayment ledger entry, `LR-` prefixed
pub fn repayment_reference() -> String {
    format!("LR-{}", &Uuid::new_v4().to_string()[..8].to_uppercase())
}

/// reference id for a disbursement ledger entry, `LN-` prefixed
pub fn disbursement_reference() -> String {
    format!("LN-{}", &Uuid::new_v4().to_string()[..8].to_uppercase())
}
