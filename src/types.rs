use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a repayment posting
pub type RepaymentId = Uuid;

/// unique identifier for a deposit account
pub type AccountId = Uuid;

/// loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// application submitted, awaiting officer decision
    Pending,
    /// approved and disbursed, repayments accepted
    Approved,
    /// declined by an officer, terminal
    Rejected,
    /// outstanding fully repaid, terminal
    Completed,
}

impl LoanStatus {
    /// loans in these states block a new application for the same customer
    pub fn is_outstanding(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Approved)
    }
}

/// classification of a repayment posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaymentStatus {
    /// posted before the due date without settling the loan
    Partial,
    /// the posting that drove the loan to zero, on time
    Completed,
    /// posted after the loan's due date
    Late,
}

/// deposit account status as reported by the account ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

/// kind of ledger entry posted against an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntryKind {
    /// principal credited on approval
    Disbursement,
    /// repayment debited from the payer account
    LoanRepayment,
}

/// one account transaction, as supplied by the account ledger for
/// eligibility scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
}

/// eligibility bracket a customer's inflow maps into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityBracket {
    Low,
    Medium,
    High,
}
