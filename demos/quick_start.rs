/// quick start - apply, approve and repay a loan
use chrono::Duration;
use loan_servicing_rs::ledger::{LogAudit, LogNotifier};
use loan_servicing_rs::{
    AccountStatus, InMemoryAccountLedger, LoanConfig, LoanDesk, Money, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let time = SafeTimeProvider::new(TimeSource::System);
    let ledger = InMemoryAccountLedger::new();

    // an active account with six months of inflows
    let account = ledger.open_account("alice", AccountStatus::Active, Money::from_major(500));
    for day in 1..=6 {
        ledger.record_transaction(
            account,
            Money::from_major(4_000),
            time.now() - Duration::days(day * 20),
        );
    }

    let desk = LoanDesk::new(LoanConfig::default(), ledger, LogNotifier, LogAudit)?;

    // apply for 1,000 over 30 days at the default 30% term rate
    let loan = desk.apply("alice", account, Money::from_major(1_000), 30, None, None, &time)?;
    println!("applied: {} due {} total {}", loan.id, loan.due_date, loan.total_due);

    // an officer approves; the principal lands on the account
    let loan = desk.approve(loan.id, "officer-1", "income verified", &time)?;
    println!("approved, balance is now {}", desk.ledger().balance_of(account));

    // pay it all off
    let loan = desk.repay(loan.id, None, loan.total_due, None, "alice", &time)?;
    println!("settled: status {:?}, outstanding {}", loan.status, loan.outstanding);

    Ok(())
}
