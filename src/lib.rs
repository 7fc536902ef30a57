pub mod config;
pub mod decimal;
pub mod eligibility;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod penalty;
pub mod scheduler;
pub mod service;
pub mod types;
pub mod views;

// re-export key types
pub use config::LoanConfig;
pub use decimal::{Money, Rate};
pub use eligibility::EligibilityOutcome;
pub use errors::{LoanError, Result};
pub use events::{EventStore, LoanEvent};
pub use ledger::{
    AccountInfo, AccountLedger, AuditSink, InMemoryAccountLedger, LedgerEntry, NoticeKind,
    NotificationSink,
};
pub use loan::{Loan, Repayment};
pub use penalty::{PenaltySweepSummary, PostedPenalty};
pub use scheduler::PenaltyScheduler;
pub use service::LoanDesk;
pub use types::{
    AccountId, AccountStatus, EligibilityBracket, LedgerEntryKind, LoanId, LoanStatus,
    RepaymentId, RepaymentStatus, TransactionRecord,
};
pub use views::{LoanView, RepaymentView, StatementView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
