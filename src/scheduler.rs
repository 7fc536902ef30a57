use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use tokio::time;
use tracing::{error, info};

use crate::errors::{LoanError, Result};
use crate::ledger::{AccountLedger, AuditSink, NotificationSink};
use crate::service::LoanDesk;

/// background driver for the daily penalty sweep
///
/// Parses the configured cron expression (seconds-resolution, e.g.
/// `0 0 0 * * *` for midnight) and fires the sweep at every occurrence.
pub struct PenaltyScheduler<L, N, A> {
    desk: Arc<LoanDesk<L, N, A>>,
    schedule: Schedule,
    expression: String,
}

impl<L, N, A> std::fmt::Debug for PenaltyScheduler<L, N, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PenaltyScheduler")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

impl<L, N, A> PenaltyScheduler<L, N, A>
where
    L: AccountLedger + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
    A: AuditSink + Send + Sync + 'static,
{
    /// build a scheduler from the desk's configured cron expression
    pub fn from_config(desk: Arc<LoanDesk<L, N, A>>) -> Result<Self> {
        let expression = desk.config().penalty_cron.clone();
        let schedule = Schedule::from_str(&expression).map_err(|err| LoanError::Validation {
            message: format!("invalid penalty cron expression {:?}: {}", expression, err),
        })?;
        Ok(Self {
            desk,
            schedule,
            expression,
        })
    }

    /// spawn the sweep loop as a background task
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(schedule = %self.expression, "penalty scheduler started");
            loop {
                let Some(next) = self.schedule.upcoming(Utc).next() else {
                    error!("penalty schedule has no further occurrences, stopping");
                    break;
                };
                let wait = match (next - Utc::now()).to_std() {
                    Ok(wait) => wait,
                    // occurrence already passed while we were sweeping
                    Err(_) => continue,
                };
                time::sleep(wait).await;

                let summary = self.desk.run_penalty_sweep_now();
                info!(
                    date = %summary.date,
                    posted = summary.posted,
                    total = %summary.total_penalty,
                    failures = summary.failures,
                    "scheduled penalty sweep completed"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoanConfig;
    use crate::ledger::{CollectingAudit, CollectingNotifier, InMemoryAccountLedger};

    fn desk_arc(config: LoanConfig) -> Arc<LoanDesk<InMemoryAccountLedger, CollectingNotifier, CollectingAudit>> {
        Arc::new(
            LoanDesk::new(
                config,
                InMemoryAccountLedger::new(),
                CollectingNotifier::new(),
                CollectingAudit::new(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_default_cron_parses() {
        let scheduler = PenaltyScheduler::from_config(desk_arc(LoanConfig::default())).unwrap();
        // midnight every day, so the next occurrence is strictly in the future
        let next = scheduler.schedule.upcoming(Utc).next().unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn test_invalid_cron_rejected() {
        let config = LoanConfig {
            penalty_cron: "not a cron line".to_string(),
            ..LoanConfig::default()
        };
        let err = PenaltyScheduler::from_config(desk_arc(config)).unwrap_err();
        assert!(matches!(err, LoanError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_every_second_schedule_fires_sweep() {
        let config = LoanConfig {
            penalty_cron: "* * * * * *".to_string(),
            ..LoanConfig::default()
        };
        let desk = desk_arc(config);
        let scheduler = PenaltyScheduler::from_config(Arc::clone(&desk)).unwrap();

        let handle = scheduler.start();
        // an empty book sweeps instantly; one tick is enough to prove the loop runs
        time::sleep(time::Duration::from_millis(1_500)).await;
        handle.abort();
    }
}
