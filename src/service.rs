use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;

use crate::config::LoanConfig;
use crate::decimal::{Money, Rate};
use crate::eligibility;
use crate::errors::{LoanError, Result};
use crate::events::{EventStore, LoanEvent};
use crate::ledger::{
    AccountLedger, AuditSink, LedgerEntry, NoticeKind, NotificationSink,
};
use crate::loan::{disbursement_reference, repayment_reference, Loan, Repayment};
use crate::penalty::{self, PenaltySweepSummary};
use crate::types::{AccountId, LedgerEntryKind, LoanId, LoanStatus, RepaymentId, RepaymentStatus};

/// the book of record: loans, repayment postings, the per-day penalty
/// ledger and the event trail, guarded as one unit
///
/// Loans and repayments are never deleted. The penalty ledger keys
/// `(loan, date)` so an overdue day is charged at most once no matter how
/// often the sweep or a repayment-time catch-up runs.
#[derive(Debug, Default)]
pub struct LoanBook {
    pub(crate) loans: HashMap<LoanId, Loan>,
    pub(crate) repayments: HashMap<RepaymentId, Repayment>,
    pub(crate) penalty_posted: HashSet<(LoanId, NaiveDate)>,
    pub(crate) events: EventStore,
}

impl LoanBook {
    pub fn loan(&self, id: LoanId) -> Result<&Loan> {
        self.loans.get(&id).ok_or(LoanError::LoanNotFound { id })
    }

    pub fn loan_mut(&mut self, id: LoanId) -> Result<&mut Loan> {
        self.loans.get_mut(&id).ok_or(LoanError::LoanNotFound { id })
    }

    /// loans blocking a new application for this customer
    pub fn has_outstanding_for(&self, customer_id: &str) -> bool {
        self.loans
            .values()
            .any(|l| l.customer_id == customer_id && l.status.is_outstanding())
    }

    /// repayment postings for one loan, oldest first
    pub fn repayments_for(&self, loan_id: LoanId) -> Vec<Repayment> {
        let mut rows: Vec<Repayment> = self
            .repayments
            .values()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.paid_at);
        rows
    }
}

/// the loan lifecycle service
///
/// Orchestrates application, officer decision, disbursement, repayment and
/// completion over the collaborator seams. Every operation is one atomic
/// read-modify-write under the book mutex; the penalty sweep takes the same
/// mutex, so a customer repayment and the accrual job can never lose each
/// other's update.
pub struct LoanDesk<L, N, A> {
    config: LoanConfig,
    ledger: L,
    notifier: N,
    audit: A,
    book: Mutex<LoanBook>,
}

impl<L, N, A> LoanDesk<L, N, A>
where
    L: AccountLedger,
    N: NotificationSink,
    A: AuditSink,
{
    pub fn new(config: LoanConfig, ledger: L, notifier: N, audit: A) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ledger,
            notifier,
            audit,
            book: Mutex::new(LoanBook::default()),
        })
    }

    pub fn config(&self) -> &LoanConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    /// submit a loan application
    ///
    /// On success the loan is persisted in PENDING with `outstanding ==
    /// total_due` and the configured penalty rate snapshotted onto it.
    pub fn apply(
        &self,
        customer_id: &str,
        account_id: AccountId,
        principal: Money,
        term_days: u32,
        interest_rate_override: Option<Rate>,
        reason: Option<String>,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        if !principal.is_positive() {
            return Err(LoanError::Validation {
                message: "principal must be positive".to_string(),
            });
        }
        if term_days == 0 {
            return Err(LoanError::Validation {
                message: "term must be at least one day".to_string(),
            });
        }
        if let Some(rate) = interest_rate_override {
            if rate.as_decimal().is_sign_negative() {
                return Err(LoanError::Validation {
                    message: "interest rate must not be negative".to_string(),
                });
            }
        }

        let account = self.ledger.account(account_id)?;
        if account.owner != customer_id {
            return Err(LoanError::AccountNotOwned {
                id: account_id,
                customer: customer_id.to_string(),
            });
        }
        if account.status != crate::types::AccountStatus::Active {
            return Err(LoanError::AccountNotActive {
                id: account_id,
                status: account.status,
            });
        }

        // a held loan blocks the application outright, whatever the amount;
        // this rule is owned here, not by the evaluator
        if self.book.lock().unwrap().has_outstanding_for(customer_id) {
            return Err(LoanError::DuplicateOutstandingLoan {
                customer: customer_id.to_string(),
            });
        }

        let now = time.now();

        // eligibility is pure and runs outside the book lock
        let transactions = self.ledger.transactions(account_id);
        eligibility::evaluate(&transactions, principal, now, &self.config)?;

        let interest_rate = interest_rate_override.unwrap_or(self.config.base_interest_rate);

        let mut book = self.book.lock().unwrap();
        // re-check: another application may have landed while scoring
        if book.has_outstanding_for(customer_id) {
            return Err(LoanError::DuplicateOutstandingLoan {
                customer: customer_id.to_string(),
            });
        }

        let loan = Loan::open(
            customer_id.to_string(),
            account_id,
            principal,
            interest_rate,
            term_days,
            self.config.penalty_percent_per_day,
            reason,
            now,
        );

        book.events.emit(LoanEvent::ApplicationSubmitted {
            loan_id: loan.id,
            customer_id: customer_id.to_string(),
            principal,
            total_due: loan.total_due,
            due_date: loan.due_date,
            timestamp: now,
        });
        book.loans.insert(loan.id, loan.clone());
        drop(book);

        tracing::info!(loan_id = %loan.id, customer_id, %principal, "loan application submitted");
        self.notifier.notify(
            customer_id,
            NoticeKind::LoanSubmitted,
            "Your loan request has been submitted and is pending approval.",
        );

        Ok(loan)
    }

    /// approve a pending loan: credit the principal to the loan account,
    /// post a DISBURSEMENT entry and move the loan to APPROVED
    pub fn approve(
        &self,
        loan_id: LoanId,
        officer: &str,
        remark: &str,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        let now = time.now();
        let mut book = self.book.lock().unwrap();

        let loan = book.loan(loan_id)?;
        if loan.status != LoanStatus::Pending {
            return Err(LoanError::NotPending { status: loan.status });
        }
        let account_id = loan.account_id;
        let principal = loan.principal;

        // ledger movement first; a credit failure aborts with no loan mutation
        self.ledger.credit(account_id, principal)?;
        self.ledger.post(LedgerEntry {
            account_id,
            kind: LedgerEntryKind::Disbursement,
            amount: principal,
            reference_id: disbursement_reference(),
            description: format!("Loan disbursed #{}", loan_id),
            posted_at: now,
        });

        let loan = book.loan_mut(loan_id)?;
        loan.status = LoanStatus::Approved;
        loan.remark = Some(remark.to_string());
        loan.decided_by = Some(officer.to_string());
        let updated = loan.clone();

        book.events.emit(LoanEvent::StatusChanged {
            loan_id,
            old_status: LoanStatus::Pending,
            new_status: LoanStatus::Approved,
            timestamp: now,
        });
        book.events.emit(LoanEvent::LoanApproved {
            loan_id,
            officer: officer.to_string(),
            disbursed: principal,
            account_id,
            timestamp: now,
        });
        drop(book);

        tracing::info!(loan_id = %loan_id, officer, %principal, "loan approved and disbursed");
        self.audit.record(
            officer,
            "LOAN_APPROVE",
            &format!("loan {} approved, {} disbursed to {}", loan_id, principal, account_id),
        );
        self.notifier.notify(
            &updated.customer_id,
            NoticeKind::LoanApproved,
            &format!("Your loan #{} has been approved and disbursed.", loan_id),
        );

        Ok(updated)
    }

    /// reject a pending loan; no ledger movement
    pub fn reject(
        &self,
        loan_id: LoanId,
        officer: &str,
        remark: &str,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        let now = time.now();
        let mut book = self.book.lock().unwrap();

        let loan = book.loan_mut(loan_id)?;
        if loan.status != LoanStatus::Pending {
            return Err(LoanError::NotPending { status: loan.status });
        }
        loan.status = LoanStatus::Rejected;
        loan.remark = Some(remark.to_string());
        loan.decided_by = Some(officer.to_string());
        let updated = loan.clone();

        book.events.emit(LoanEvent::StatusChanged {
            loan_id,
            old_status: LoanStatus::Pending,
            new_status: LoanStatus::Rejected,
            timestamp: now,
        });
        book.events.emit(LoanEvent::LoanRejected {
            loan_id,
            officer: officer.to_string(),
            remark: remark.to_string(),
            timestamp: now,
        });
        drop(book);

        tracing::info!(loan_id = %loan_id, officer, "loan rejected");
        self.audit.record(
            officer,
            "LOAN_REJECT",
            &format!("loan {} rejected: {}", loan_id, remark),
        );
        self.notifier.notify(
            &updated.customer_id,
            NoticeKind::LoanRejected,
            &format!("Your loan #{} has been rejected.", loan_id),
        );

        Ok(updated)
    }

    /// post a repayment against an approved loan
    ///
    /// The payer account defaults to the loan's own account. Overdue penalty
    /// for the current day is caught up through the shared penalty ledger
    /// before the payment applies, so this path and the daily sweep can never
    /// charge the same day twice.
    pub fn repay(
        &self,
        loan_id: LoanId,
        payer_account: Option<AccountId>,
        amount: Money,
        note: Option<String>,
        customer_id: &str,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        if !amount.is_positive() {
            return Err(LoanError::Validation {
                message: "repayment amount must be positive".to_string(),
            });
        }

        let now = time.now();
        let today = now.date_naive();
        let mut book = self.book.lock().unwrap();

        let loan = book.loan(loan_id)?;
        match loan.status {
            LoanStatus::Rejected => return Err(LoanError::LoanRejected),
            LoanStatus::Pending => return Err(LoanError::LoanNotDisbursed),
            LoanStatus::Completed => return Err(LoanError::LoanAlreadyCompleted),
            LoanStatus::Approved => {}
        }
        let loan_account = loan.account_id;
        let due_date = loan.due_date;

        let payer_id = payer_account.unwrap_or(loan_account);
        let payer = self.ledger.account(payer_id)?;
        if payer.owner != customer_id {
            return Err(LoanError::AccountNotOwned {
                id: payer_id,
                customer: customer_id.to_string(),
            });
        }
        if payer.status != crate::types::AccountStatus::Active {
            return Err(LoanError::AccountNotActive {
                id: payer_id,
                status: payer.status,
            });
        }
        if payer.balance < amount {
            return Err(LoanError::InsufficientBalance {
                available: payer.balance,
                requested: amount,
            });
        }

        // catch up today's overdue penalty before the payment applies
        penalty::accrue_pending_for_loan(&mut book, loan_id, today)?;

        // all validation passed: move the money, then bookkeep
        self.ledger.debit(payer_id, amount)?;
        let reference_id = repayment_reference();
        self.ledger.post(LedgerEntry {
            account_id: payer_id,
            kind: LedgerEntryKind::LoanRepayment,
            amount,
            reference_id: reference_id.clone(),
            description: format!("Loan repayment for loan #{}", loan_id),
            posted_at: now,
        });

        let loan = book.loan_mut(loan_id)?;
        let finished = loan.apply_payment(amount);
        let new_outstanding = loan.outstanding;
        let customer = loan.customer_id.clone();
        let updated = loan.clone();

        let classification = if today > due_date {
            RepaymentStatus::Late
        } else if finished {
            RepaymentStatus::Completed
        } else {
            RepaymentStatus::Partial
        };

        let row = Repayment::new(
            loan_id,
            payer_id,
            amount,
            classification,
            reference_id,
            note,
            now,
        );
        let repayment_id = row.id;
        book.repayments.insert(row.id, row);

        book.events.emit(LoanEvent::RepaymentPosted {
            loan_id,
            repayment_id,
            amount,
            new_outstanding,
            classification,
            timestamp: now,
        });
        if finished {
            book.events.emit(LoanEvent::StatusChanged {
                loan_id,
                old_status: LoanStatus::Approved,
                new_status: LoanStatus::Completed,
                timestamp: now,
            });
            book.events.emit(LoanEvent::LoanCompleted {
                loan_id,
                final_payment: amount,
                timestamp: now,
            });
        }
        drop(book);

        tracing::info!(
            loan_id = %loan_id,
            %amount,
            %new_outstanding,
            ?classification,
            "repayment posted"
        );
        self.notifier.notify(
            &customer,
            NoticeKind::LoanRepayment,
            &format!("Repayment of {} received for loan #{}.", amount, loan_id),
        );

        Ok(updated)
    }

    /// officer view: applications awaiting a decision
    pub fn list_pending(&self) -> Vec<Loan> {
        let book = self.book.lock().unwrap();
        let mut loans: Vec<Loan> = book
            .loans
            .values()
            .filter(|l| l.status == LoanStatus::Pending)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.applied_at);
        loans
    }

    /// officer view: every loan on the book
    pub fn list_all(&self) -> Vec<Loan> {
        let book = self.book.lock().unwrap();
        let mut loans: Vec<Loan> = book.loans.values().cloned().collect();
        loans.sort_by_key(|l| l.applied_at);
        loans
    }

    /// customer view: own loans only
    pub fn loans_for(&self, customer_id: &str) -> Vec<Loan> {
        let book = self.book.lock().unwrap();
        let mut loans: Vec<Loan> = book
            .loans
            .values()
            .filter(|l| l.customer_id == customer_id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.applied_at);
        loans
    }

    pub fn loan(&self, id: LoanId) -> Result<Loan> {
        self.book.lock().unwrap().loan(id).cloned()
    }

    pub fn repayment(&self, id: RepaymentId) -> Result<Repayment> {
        self.book
            .lock()
            .unwrap()
            .repayments
            .get(&id)
            .cloned()
            .ok_or(LoanError::RepaymentNotFound { id })
    }

    /// repayment rows for a loan, oldest first
    pub fn statement(&self, loan_id: LoanId) -> Result<Vec<Repayment>> {
        let book = self.book.lock().unwrap();
        book.loan(loan_id)?;
        Ok(book.repayments_for(loan_id))
    }

    /// run the daily penalty sweep against the book
    pub fn run_penalty_sweep(&self, time: &SafeTimeProvider) -> PenaltySweepSummary {
        let today = time.now().date_naive();
        let mut book = self.book.lock().unwrap();
        penalty::run_daily_sweep(
            &mut book,
            &self.notifier,
            self.config.penalty_percent_per_day,
            today,
        )
    }

    /// run the sweep with system time
    pub fn run_penalty_sweep_now(&self) -> PenaltySweepSummary {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.run_penalty_sweep(&time)
    }

    /// drain the collected event trail
    pub fn take_events(&self) -> Vec<LoanEvent> {
        self.book.lock().unwrap().events.take_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CollectingAudit, CollectingNotifier, InMemoryAccountLedger};
    use crate::types::AccountStatus;
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    type TestDesk = LoanDesk<InMemoryAccountLedger, CollectingNotifier, CollectingAudit>;

    fn desk() -> TestDesk {
        LoanDesk::new(
            LoanConfig::default(),
            InMemoryAccountLedger::new(),
            CollectingNotifier::new(),
            CollectingAudit::new(),
        )
        .unwrap()
    }

    fn test_clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ))
    }

    /// open an active account with enough history to clear the high bracket
    fn seed_account(desk: &TestDesk, owner: &str, balance: i64, time: &SafeTimeProvider) -> AccountId {
        let id = desk
            .ledger()
            .open_account(owner, AccountStatus::Active, Money::from_major(balance));
        for day in 1..=6 {
            desk.ledger().record_transaction(
                id,
                Money::from_major(5_000),
                time.now() - Duration::days(day),
            );
        }
        id
    }

    fn apply_standard(desk: &TestDesk, customer: &str, account: AccountId, time: &SafeTimeProvider) -> Loan {
        desk.apply(
            customer,
            account,
            Money::from_major(1_000),
            30,
            None,
            None,
            time,
        )
        .unwrap()
    }

    #[test]
    fn test_apply_creates_pending_loan() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);

        let loan = apply_standard(&desk, "cust-1", account, &time);

        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.total_due, Money::from_major(1_300));
        assert_eq!(loan.outstanding, Money::from_major(1_300));
        assert_eq!(loan.interest_rate, Rate::from_decimal(dec!(0.30)));
        assert_eq!(loan.penalty_percent_per_day, Rate::from_decimal(dec!(0.05)));
        assert_eq!(
            loan.due_date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );

        let notices = desk.notifier().notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::LoanSubmitted);
    }

    #[test]
    fn test_apply_honors_rate_override() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);

        let loan = desk
            .apply(
                "cust-1",
                account,
                Money::from_major(1_000),
                30,
                Some(Rate::from_decimal(dec!(0.10))),
                Some("equipment".to_string()),
                &time,
            )
            .unwrap();

        assert_eq!(loan.total_due, Money::from_major(1_100));
        assert_eq!(loan.remark.as_deref(), Some("equipment"));
    }

    #[test]
    fn test_apply_rejects_foreign_account() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);

        let err = desk
            .apply("cust-2", account, Money::from_major(500), 30, None, None, &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::AccountNotOwned { .. }));
    }

    #[test]
    fn test_apply_rejects_inactive_account() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);
        desk.ledger().set_status(account, AccountStatus::Frozen);

        let err = desk
            .apply("cust-1", account, Money::from_major(500), 30, None, None, &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::AccountNotActive { .. }));
    }

    #[test]
    fn test_apply_surfaces_eligibility_failures() {
        let desk = desk();
        let time = test_clock();
        let quiet = desk
            .ledger()
            .open_account("cust-1", AccountStatus::Active, Money::from_major(100));

        let err = desk
            .apply("cust-1", quiet, Money::from_major(500), 30, None, None, &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::InsufficientActivity { .. }));

        let account = seed_account(&desk, "cust-2", 100, &time);
        let err = desk
            .apply("cust-2", account, Money::from_major(60_000), 30, None, None, &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::ExceedsEligibility { .. }));
    }

    #[test]
    fn test_duplicate_outstanding_loan_refused() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);

        apply_standard(&desk, "cust-1", account, &time);

        // a second application is refused regardless of the amount requested,
        // including amounts the evaluator would itself refuse as over-cap
        for requested in [1, 100, 50_000, 60_000] {
            let err = desk
                .apply(
                    "cust-1",
                    account,
                    Money::from_major(requested),
                    30,
                    None,
                    None,
                    &time,
                )
                .unwrap_err();
            assert!(matches!(err, LoanError::DuplicateOutstandingLoan { .. }));
        }
    }

    #[test]
    fn test_duplicate_check_also_blocks_while_approved() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);

        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();

        let err = desk
            .apply("cust-1", account, Money::from_major(500), 30, None, None, &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::DuplicateOutstandingLoan { .. }));
    }

    #[test]
    fn test_approve_disburses_principal() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);

        let approved = desk.approve(loan.id, "officer-1", "verified income", &time).unwrap();

        assert_eq!(approved.status, LoanStatus::Approved);
        assert_eq!(approved.remark.as_deref(), Some("verified income"));
        assert_eq!(approved.decided_by.as_deref(), Some("officer-1"));
        // balance went up by the principal, not the total due
        assert_eq!(desk.ledger().balance_of(account), Money::from_major(1_100));

        let entries = desk.ledger().posted_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LedgerEntryKind::Disbursement);
        assert!(entries[0].reference_id.starts_with("LN-"));

        assert_eq!(desk.audit().records().len(), 1);
        assert_eq!(desk.audit().records()[0].action, "LOAN_APPROVE");
    }

    #[test]
    fn test_reject_leaves_ledger_untouched() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);

        let rejected = desk.reject(loan.id, "officer-1", "income unverified", &time).unwrap();

        assert_eq!(rejected.status, LoanStatus::Rejected);
        assert_eq!(desk.ledger().balance_of(account), Money::from_major(100));
        assert!(desk.ledger().posted_entries().is_empty());
        assert_eq!(desk.audit().records()[0].action, "LOAN_REJECT");
    }

    #[test]
    fn test_decisions_require_pending() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();

        let err = desk.approve(loan.id, "officer-1", "again", &time).unwrap_err();
        assert!(matches!(err, LoanError::NotPending { status: LoanStatus::Approved }));

        let err = desk.reject(loan.id, "officer-1", "too late", &time).unwrap_err();
        assert!(matches!(err, LoanError::NotPending { .. }));
    }

    #[test]
    fn test_full_repayment_completes_loan() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 300, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();

        // balance: 300 + 1000 disbursed = 1300, exactly the total due
        let settled = desk
            .repay(loan.id, None, Money::from_major(1_300), None, "cust-1", &time)
            .unwrap();

        assert_eq!(settled.status, LoanStatus::Completed);
        assert_eq!(settled.outstanding, Money::ZERO);
        assert_eq!(desk.ledger().balance_of(account), Money::ZERO);

        let rows = desk.statement(loan.id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, RepaymentStatus::Completed);
        assert!(rows[0].reference_id.starts_with("LR-"));

        assert_eq!(desk.repayment(rows[0].id).unwrap().amount_paid, Money::from_major(1_300));
        let err = desk.repayment(RepaymentId::new_v4()).unwrap_err();
        assert!(matches!(err, LoanError::RepaymentNotFound { .. }));
    }

    #[test]
    fn test_partial_then_final_repayment_roundtrip() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 300, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();

        let after_first = desk
            .repay(loan.id, None, Money::from_major(700), None, "cust-1", &time)
            .unwrap();
        assert_eq!(after_first.status, LoanStatus::Approved);
        assert_eq!(after_first.outstanding, Money::from_major(600));

        let remainder = after_first.outstanding;
        let settled = desk
            .repay(loan.id, None, remainder, None, "cust-1", &time)
            .unwrap();
        assert_eq!(settled.status, LoanStatus::Completed);
        assert_eq!(settled.outstanding, Money::ZERO);

        let rows = desk.statement(loan.id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, RepaymentStatus::Partial);
        assert_eq!(rows[1].status, RepaymentStatus::Completed);
    }

    #[test]
    fn test_late_repayment_classified_late() {
        let desk = desk();
        let time = test_clock();
        let control = time.test_control().unwrap();
        let account = seed_account(&desk, "cust-1", 300, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();

        // five days past the due date
        control.advance(Duration::days(35));

        let after = desk
            .repay(loan.id, None, Money::from_major(700), None, "cust-1", &time)
            .unwrap();

        let rows = desk.statement(loan.id).unwrap();
        assert_eq!(rows[0].status, RepaymentStatus::Late);
        assert_eq!(after.status, LoanStatus::Approved);
        // no penalty was pending: penalties key off existing repayment rows
        assert_eq!(after.outstanding, Money::from_major(600));
    }

    #[test]
    fn test_repay_failure_kinds_by_state() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 2_000, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);

        let err = desk
            .repay(loan.id, None, Money::from_major(100), None, "cust-1", &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::LoanNotDisbursed));

        desk.reject(loan.id, "officer-1", "no", &time).unwrap();
        let err = desk
            .repay(loan.id, None, Money::from_major(100), None, "cust-1", &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::LoanRejected));

        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();
        desk.repay(loan.id, None, Money::from_major(1_300), None, "cust-1", &time)
            .unwrap();
        let err = desk
            .repay(loan.id, None, Money::from_major(100), None, "cust-1", &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::LoanAlreadyCompleted));
    }

    #[test]
    fn test_repay_insufficient_balance_has_no_side_effects() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 0, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();

        // balance after disbursement is 1000; ask for more
        let err = desk
            .repay(loan.id, None, Money::from_major(1_300), None, "cust-1", &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::InsufficientBalance { .. }));

        let unchanged = desk.loan(loan.id).unwrap();
        assert_eq!(unchanged.outstanding, Money::from_major(1_300));
        assert!(desk.statement(loan.id).unwrap().is_empty());
        assert_eq!(desk.ledger().balance_of(account), Money::from_major(1_000));
    }

    #[test]
    fn test_repay_from_second_account() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);
        let savings = desk
            .ledger()
            .open_account("cust-1", AccountStatus::Active, Money::from_major(2_000));
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();

        desk.repay(loan.id, Some(savings), Money::from_major(1_300), None, "cust-1", &time)
            .unwrap();

        assert_eq!(desk.ledger().balance_of(savings), Money::from_major(700));
        // the loan account keeps its disbursed funds
        assert_eq!(desk.ledger().balance_of(account), Money::from_major(1_100));
    }

    #[test]
    fn test_repay_rejects_foreign_payer_account() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);
        let other = desk
            .ledger()
            .open_account("cust-2", AccountStatus::Active, Money::from_major(5_000));
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();

        let err = desk
            .repay(loan.id, Some(other), Money::from_major(100), None, "cust-1", &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::AccountNotOwned { .. }));
    }

    #[test]
    fn test_projections_scope_by_customer() {
        let desk = desk();
        let time = test_clock();
        let first = seed_account(&desk, "cust-1", 100, &time);
        let second = seed_account(&desk, "cust-2", 100, &time);

        let loan_one = apply_standard(&desk, "cust-1", first, &time);
        apply_standard(&desk, "cust-2", second, &time);

        assert_eq!(desk.list_pending().len(), 2);
        assert_eq!(desk.list_all().len(), 2);
        assert_eq!(desk.loans_for("cust-1").len(), 1);
        assert_eq!(desk.loans_for("cust-1")[0].id, loan_one.id);
        assert!(desk.loans_for("cust-3").is_empty());
    }

    #[test]
    fn test_completed_loan_frees_customer_for_new_application() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 300, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();
        desk.repay(loan.id, None, Money::from_major(1_300), None, "cust-1", &time)
            .unwrap();

        let next = apply_standard(&desk, "cust-1", account, &time);
        assert_eq!(next.status, LoanStatus::Pending);
    }

    #[test]
    fn test_event_trail_covers_lifecycle() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 300, &time);
        let loan = apply_standard(&desk, "cust-1", account, &time);
        desk.approve(loan.id, "officer-1", "ok", &time).unwrap();
        desk.repay(loan.id, None, Money::from_major(1_300), None, "cust-1", &time)
            .unwrap();

        let events = desk.take_events();
        assert!(events.iter().any(|e| matches!(e, LoanEvent::ApplicationSubmitted { .. })));
        assert!(events.iter().any(|e| matches!(e, LoanEvent::LoanApproved { .. })));
        assert!(events.iter().any(|e| matches!(e, LoanEvent::LoanCompleted { .. })));
        // drained
        assert!(desk.take_events().is_empty());
    }

    #[test]
    fn test_validation_errors_detected_before_mutation() {
        let desk = desk();
        let time = test_clock();
        let account = seed_account(&desk, "cust-1", 100, &time);

        let err = desk
            .apply("cust-1", account, Money::ZERO, 30, None, None, &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::Validation { .. }));

        let err = desk
            .apply("cust-1", account, Money::from_major(500), 0, None, None, &time)
            .unwrap_err();
        assert!(matches!(err, LoanError::Validation { .. }));

        assert!(desk.list_all().is_empty());
        assert!(desk.notifier().notices().is_empty());
    }
}
