use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AccountId, LoanId, LoanStatus, RepaymentId, RepaymentStatus};

/// all events emitted by the loan desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoanEvent {
    ApplicationSubmitted {
        loan_id: LoanId,
        customer_id: String,
        principal: Money,
        total_due: Money,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    LoanApproved {
        loan_id: LoanId,
        officer: String,
        disbursed: Money,
        account_id: AccountId,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        loan_id: LoanId,
        officer: String,
        remark: String,
        timestamp: DateTime<Utc>,
    },
    RepaymentPosted {
        loan_id: LoanId,
        repayment_id: RepaymentId,
        amount: Money,
        new_outstanding: Money,
        classification: RepaymentStatus,
        timestamp: DateTime<Utc>,
    },
    LoanCompleted {
        loan_id: LoanId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },
    PenaltyAccrued {
        loan_id: LoanId,
        repayment_id: RepaymentId,
        amount: Money,
        accrual_date: NaiveDate,
        new_outstanding: Money,
    },
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LoanEvent>,
}

impl EventStore {
    pub fn emit(&mut self, event: LoanEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<LoanEvent> {
        std::mem::take(&mut self.events)
    }
}
