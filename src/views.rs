/// serialization support for loans and statements
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::loan::{Loan, Repayment};
use crate::types::{AccountId, LoanId, LoanStatus, RepaymentId, RepaymentStatus};

/// serializable view of a loan's state
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub customer_id: String,
    pub account_id: AccountId,
    pub status: LoanStatus,
    pub principal: Money,
    pub interest_rate: Rate,
    pub total_due: Money,
    pub outstanding: Money,
    pub term_days: u32,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub days_overdue: u32,
    pub penalty_percent_per_day: Rate,
    pub remark: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub decided_by: Option<String>,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, today: NaiveDate) -> Self {
        LoanView {
            id: loan.id,
            customer_id: loan.customer_id.clone(),
            account_id: loan.account_id,
            status: loan.status,
            principal: loan.principal,
            interest_rate: loan.interest_rate,
            total_due: loan.total_due,
            outstanding: loan.outstanding,
            term_days: loan.term_days,
            start_date: loan.start_date,
            due_date: loan.due_date,
            days_overdue: if loan.status == LoanStatus::Approved {
                loan.days_overdue(today)
            } else {
                0
            },
            penalty_percent_per_day: loan.penalty_percent_per_day,
            remark: loan.remark.clone(),
            applied_at: loan.applied_at,
            decided_by: loan.decided_by.clone(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// one repayment row on a statement
#[derive(Debug, Serialize, Deserialize)]
pub struct RepaymentView {
    pub id: RepaymentId,
    pub loan_id: LoanId,
    pub account_id: AccountId,
    pub amount_paid: Money,
    pub penalty_amount: Money,
    pub status: RepaymentStatus,
    pub reference_id: String,
    pub note: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl RepaymentView {
    pub fn from_repayment(row: &Repayment) -> Self {
        RepaymentView {
            id: row.id,
            loan_id: row.loan_id,
            account_id: row.account_id,
            amount_paid: row.amount_paid,
            penalty_amount: row.penalty_amount,
            status: row.status,
            reference_id: row.reference_id.clone(),
            note: row.note.clone(),
            paid_at: row.paid_at,
        }
    }
}

/// a loan and its repayment history, oldest row first
#[derive(Debug, Serialize, Deserialize)]
pub struct StatementView {
    pub loan: LoanView,
    pub repayments: Vec<RepaymentView>,
    pub total_paid: Money,
    pub total_penalty: Money,
}

impl StatementView {
    pub fn new(loan: &Loan, rows: &[Repayment], today: NaiveDate) -> Self {
        StatementView {
            loan: LoanView::from_loan(loan, today),
            repayments: rows.iter().map(RepaymentView::from_repayment).collect(),
            total_paid: rows.iter().fold(Money::ZERO, |acc, r| acc + r.amount_paid),
            total_penalty: rows.iter().fold(Money::ZERO, |acc, r| acc + r.penalty_amount),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
