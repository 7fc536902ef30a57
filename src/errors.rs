use thiserror::Error;

use crate::decimal::Money;
use crate::types::{AccountId, AccountStatus, LoanId, LoanStatus, RepaymentId};

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("account not found: {id}")]
    AccountNotFound {
        id: AccountId,
    },

    #[error("repayment not found: {id}")]
    RepaymentNotFound {
        id: RepaymentId,
    },

    #[error("account {id} does not belong to customer {customer}")]
    AccountNotOwned {
        id: AccountId,
        customer: String,
    },

    #[error("account {id} is not active: {status:?}")]
    AccountNotActive {
        id: AccountId,
        status: AccountStatus,
    },

    #[error("customer {customer} already has an outstanding loan")]
    DuplicateOutstandingLoan {
        customer: String,
    },

    #[error("not eligible: requires at least {required} transactions in last {lookback_months} months, found {found}")]
    InsufficientActivity {
        required: u32,
        found: u32,
        lookback_months: u32,
    },

    #[error("requested loan exceeds eligibility limit: max allowed {max_principal}, requested {requested}")]
    ExceedsEligibility {
        max_principal: Money,
        requested: Money,
    },

    #[error("only pending loans can be decided: current status is {status:?}")]
    NotPending {
        status: LoanStatus,
    },

    #[error("pending loan not yet disbursed")]
    LoanNotDisbursed,

    #[error("rejected loan cannot be repaid")]
    LoanRejected,

    #[error("loan is already completed")]
    LoanAlreadyCompleted,

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Money,
        requested: Money,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LoanError>;
