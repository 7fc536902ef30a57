use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::{AccountId, AccountStatus, LedgerEntryKind, TransactionRecord};

/// account snapshot as reported by the account ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: AccountId,
    pub owner: String,
    pub status: AccountStatus,
    pub balance: Money,
}

/// a ledger entry posted alongside a balance movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account_id: AccountId,
    pub kind: LedgerEntryKind,
    pub amount: Money,
    pub reference_id: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
}

/// the account ledger capability the loan engine consumes
///
/// A debit or credit failure aborts the calling operation; the engine never
/// mutates loan state after a failed balance movement.
pub trait AccountLedger {
    fn account(&self, id: AccountId) -> Result<AccountInfo>;
    fn debit(&self, id: AccountId, amount: Money) -> Result<()>;
    fn credit(&self, id: AccountId, amount: Money) -> Result<()>;
    fn post(&self, entry: LedgerEntry);
    /// transaction history feeding eligibility scoring
    fn transactions(&self, id: AccountId) -> Vec<TransactionRecord>;
}

/// event types carried on customer notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    LoanSubmitted,
    LoanApproved,
    LoanRejected,
    LoanRepayment,
    PenaltyApplied,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::LoanSubmitted => "LOAN_SUBMITTED",
            NoticeKind::LoanApproved => "LOAN_APPROVED",
            NoticeKind::LoanRejected => "LOAN_REJECTED",
            NoticeKind::LoanRepayment => "LOAN_REPAYMENT",
            NoticeKind::PenaltyApplied => "PENALTY_APPLIED",
        }
    }
}

/// fire-and-forget notification sink; by signature it cannot fail the caller
pub trait NotificationSink {
    fn notify(&self, customer_id: &str, kind: NoticeKind, message: &str);
}

/// compliance trail for officer-facing actions
pub trait AuditSink {
    fn record(&self, actor: &str, action: &str, details: &str);
}

#[derive(Debug)]
struct AccountRecord {
    info: AccountInfo,
    history: Vec<TransactionRecord>,
}

/// in-memory account ledger for tests and demos
#[derive(Debug, Default)]
pub struct InMemoryAccountLedger {
    accounts: Mutex<HashMap<AccountId, AccountRecord>>,
    entries: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryAccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// open an account and return its id
    pub fn open_account(&self, owner: &str, status: AccountStatus, balance: Money) -> AccountId {
        let id = Uuid::new_v4();
        let record = AccountRecord {
            info: AccountInfo {
                id,
                owner: owner.to_string(),
                status,
                balance,
            },
            history: Vec::new(),
        };
        self.accounts.lock().unwrap().insert(id, record);
        id
    }

    /// seed a transaction into the account's history (eligibility input)
    pub fn record_transaction(&self, id: AccountId, amount: Money, timestamp: DateTime<Utc>) {
        if let Some(record) = self.accounts.lock().unwrap().get_mut(&id) {
            record.history.push(TransactionRecord { amount, timestamp });
        }
    }

    pub fn set_status(&self, id: AccountId, status: AccountStatus) {
        if let Some(record) = self.accounts.lock().unwrap().get_mut(&id) {
            record.info.status = status;
        }
    }

    pub fn balance_of(&self, id: AccountId) -> Money {
        self.accounts
            .lock()
            .unwrap()
            .get(&id)
            .map(|r| r.info.balance)
            .unwrap_or(Money::ZERO)
    }

    pub fn posted_entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn require_active(record: &AccountRecord) -> Result<()> {
        if record.info.status != AccountStatus::Active {
            return Err(LoanError::AccountNotActive {
                id: record.info.id,
                status: record.info.status,
            });
        }
        Ok(())
    }
}

impl AccountLedger for InMemoryAccountLedger {
    fn account(&self, id: AccountId) -> Result<AccountInfo> {
        self.accounts
            .lock()
            .unwrap()
            .get(&id)
            .map(|r| r.info.clone())
            .ok_or(LoanError::AccountNotFound { id })
    }

    fn debit(&self, id: AccountId, amount: Money) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let record = accounts
            .get_mut(&id)
            .ok_or(LoanError::AccountNotFound { id })?;
        Self::require_active(record)?;
        if record.info.balance < amount {
            return Err(LoanError::InsufficientBalance {
                available: record.info.balance,
                requested: amount,
            });
        }
        record.info.balance -= amount;
        Ok(())
    }

    fn credit(&self, id: AccountId, amount: Money) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let record = accounts
            .get_mut(&id)
            .ok_or(LoanError::AccountNotFound { id })?;
        record.info.balance += amount;
        Ok(())
    }

    fn post(&self, entry: LedgerEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    fn transactions(&self, id: AccountId) -> Vec<TransactionRecord> {
        self.accounts
            .lock()
            .unwrap()
            .get(&id)
            .map(|r| r.history.clone())
            .unwrap_or_default()
    }
}

/// a delivered notice, captured by the collecting sink
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub customer_id: String,
    pub kind: NoticeKind,
    pub message: String,
}

/// notification sink that captures notices for inspection
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl NotificationSink for CollectingNotifier {
    fn notify(&self, customer_id: &str, kind: NoticeKind, message: &str) {
        self.notices.lock().unwrap().push(Notice {
            customer_id: customer_id.to_string(),
            kind,
            message: message.to_string(),
        });
    }
}

/// notification sink that only logs
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, customer_id: &str, kind: NoticeKind, message: &str) {
        tracing::info!(customer_id, kind = kind.as_str(), message, "notification");
    }
}

/// an audit record, captured by the collecting sink
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub actor: String,
    pub action: String,
    pub details: String,
}

/// audit sink that captures records for inspection
#[derive(Debug, Default)]
pub struct CollectingAudit {
    records: Mutex<Vec<AuditRecord>>,
}

impl CollectingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for CollectingAudit {
    fn record(&self, actor: &str, action: &str, details: &str) {
        self.records.lock().unwrap().push(AuditRecord {
            actor: actor.to_string(),
            action: action.to_string(),
            details: details.to_string(),
        });
    }
}

/// audit sink that only logs
#[derive(Debug, Default)]
pub struct LogAudit;

impl AuditSink for LogAudit {
    fn record(&self, actor: &str, action: &str, details: &str) {
        tracing::info!(actor, action, details, "audit");
    }
}
