/// late repayment - controlled time, overdue penalties and the daily sweep
use chrono::{Duration, TimeZone, Utc};
use loan_servicing_rs::ledger::{LogAudit, LogNotifier};
use loan_servicing_rs::views::StatementView;
use loan_servicing_rs::{
    AccountStatus, InMemoryAccountLedger, LoanConfig, LoanDesk, Money, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // controlled time so the walkthrough is deterministic
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let ledger = InMemoryAccountLedger::new();
    let account = ledger.open_account("bob", AccountStatus::Active, Money::from_major(2_000));
    for day in 1..=6 {
        ledger.record_transaction(
            account,
            Money::from_major(5_000),
            time.now() - Duration::days(day * 15),
        );
    }

    let desk = LoanDesk::new(LoanConfig::default(), ledger, LogNotifier, LogAudit)?;

    // 1,000 over 30 days at 30%: total due 1,300
    let loan = desk.apply("bob", account, Money::from_major(1_000), 30, None, None, &time)?;
    let loan = desk.approve(loan.id, "officer-1", "ok", &time)?;
    println!("due {} for {}", loan.due_date, loan.total_due);

    // a partial payment before the due date leaves 600 outstanding
    let loan = desk.repay(loan.id, None, Money::from_major(700), None, "bob", &time)?;
    println!("after partial payment: outstanding {}", loan.outstanding);

    // one day past due: the sweep charges 5% of the balance
    controller.advance(Duration::days(31));
    let summary = desk.run_penalty_sweep(&time);
    println!(
        "sweep on {}: {} posted, {} total penalty",
        summary.date, summary.posted, summary.total_penalty
    );

    // a second run on the same day is a no-op
    let again = desk.run_penalty_sweep(&time);
    println!("second run posted {}", again.posted);

    // next day the penalty compounds on the grown balance
    controller.advance(Duration::days(1));
    let summary = desk.run_penalty_sweep(&time);
    println!("next day penalty: {}", summary.total_penalty);

    // settle whatever is left
    let loan = desk.loan(loan.id)?;
    let loan = desk.repay(loan.id, None, loan.outstanding, None, "bob", &time)?;
    println!("settled: {:?}", loan.status);

    let statement = StatementView::new(
        &loan,
        &desk.statement(loan.id)?,
        time.now().date_naive(),
    );
    println!("{}", statement.to_json_pretty()?);

    Ok(())
}
