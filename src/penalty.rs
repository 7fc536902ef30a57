use chrono::NaiveDate;

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::events::LoanEvent;
use crate::ledger::{NoticeKind, NotificationSink};
use crate::service::LoanBook;
use crate::types::{LoanId, LoanStatus, RepaymentId};

/// one day's penalty posted against an overdue loan
#[derive(Debug, Clone, PartialEq)]
pub struct PostedPenalty {
    pub loan_id: LoanId,
    pub customer_id: String,
    pub repayment_id: RepaymentId,
    pub amount: Money,
    pub new_outstanding: Money,
    pub due_date: NaiveDate,
    pub accrual_date: NaiveDate,
}

/// outcome of one sweep run
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltySweepSummary {
    pub date: NaiveDate,
    pub scanned: usize,
    pub posted: usize,
    pub total_penalty: Money,
    pub failures: usize,
}

/// one day's penalty on the unpaid installment, at the loan's snapshot rate
pub fn daily_penalty(installment_due: Money, per_day: Rate) -> Money {
    installment_due * per_day
}

/// post today's penalty for one loan if it is due and not yet charged
///
/// A loan accrues only when it is APPROVED, strictly past its due date, still
/// carries a balance and has begun repaying. The base is what remains unpaid
/// of the original total due; prior penalty postings are excluded, so the
/// charge stays flat day over day. The charge keys on the loan and the
/// accrual date, so repeated runs on the same day are no-ops. Days on which
/// no run happened are not charged retroactively.
pub(crate) fn accrue_pending_for_loan(
    book: &mut LoanBook,
    loan_id: LoanId,
    today: NaiveDate,
) -> Result<Option<PostedPenalty>> {
    let loan = book.loan(loan_id)?;
    if loan.status != LoanStatus::Approved
        || !loan.is_late(today)
        || !loan.outstanding.is_positive()
        || !loan.penalty_percent_per_day.is_effective()
        || book.penalty_posted.contains(&(loan_id, today))
    {
        return Ok(None);
    }

    let rows = book.repayments_for(loan_id);
    let Some(latest) = rows.last().cloned() else {
        return Ok(None);
    };
    let paid = rows.iter().fold(Money::ZERO, |acc, r| acc + r.amount_paid);
    let base = (loan.total_due - paid).max(Money::ZERO);

    let amount = daily_penalty(base, loan.penalty_percent_per_day);
    if !amount.is_positive() {
        return Ok(None);
    }

    let loan = book.loan_mut(loan_id)?;
    loan.post_penalty(amount);
    let posted = PostedPenalty {
        loan_id,
        customer_id: loan.customer_id.clone(),
        repayment_id: latest.id,
        amount,
        new_outstanding: loan.outstanding,
        due_date: loan.due_date,
        accrual_date: today,
    };

    if let Some(row) = book.repayments.get_mut(&latest.id) {
        row.penalty_amount += amount;
    }
    book.penalty_posted.insert((loan_id, today));
    book.events.emit(LoanEvent::PenaltyAccrued {
        loan_id,
        repayment_id: latest.id,
        amount,
        accrual_date: today,
        new_outstanding: posted.new_outstanding,
    });

    Ok(Some(posted))
}

/// scan the book and post today's penalty on every overdue loan
///
/// Each loan is handled independently; a failure on one is logged and does
/// not stop the run. Skips the whole run with a warning when the configured
/// per-day rate is not positive.
pub(crate) fn run_daily_sweep<N: NotificationSink>(
    book: &mut LoanBook,
    notifier: &N,
    configured_rate: Rate,
    today: NaiveDate,
) -> PenaltySweepSummary {
    let mut summary = PenaltySweepSummary {
        date: today,
        scanned: 0,
        posted: 0,
        total_penalty: Money::ZERO,
        failures: 0,
    };

    if !configured_rate.is_effective() {
        tracing::warn!(rate = %configured_rate, "penalty rate not positive, skipping sweep");
        return summary;
    }

    let candidates: Vec<LoanId> = book
        .loans
        .values()
        .filter(|l| l.status == LoanStatus::Approved && l.is_late(today))
        .map(|l| l.id)
        .collect();
    summary.scanned = candidates.len();
    tracing::info!(date = %today, overdue = summary.scanned, "penalty sweep started");

    for loan_id in candidates {
        match accrue_pending_for_loan(book, loan_id, today) {
            Ok(Some(posted)) => {
                summary.posted += 1;
                summary.total_penalty += posted.amount;
                tracing::info!(
                    loan_id = %posted.loan_id,
                    amount = %posted.amount,
                    new_outstanding = %posted.new_outstanding,
                    "daily penalty posted"
                );
                notifier.notify(
                    &posted.customer_id,
                    NoticeKind::PenaltyApplied,
                    &format!(
                        "A late penalty of {} was applied to loan #{} (due {}).",
                        posted.amount, posted.loan_id, posted.due_date
                    ),
                );
            }
            Ok(None) => {}
            Err(err) => {
                summary.failures += 1;
                tracing::error!(loan_id = %loan_id, error = %err, "penalty accrual failed");
            }
        }
    }

    tracing::info!(
        date = %today,
        posted = summary.posted,
        total = %summary.total_penalty,
        failures = summary.failures,
        "penalty sweep finished"
    );
    summary
}
