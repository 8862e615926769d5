//! services/api/src/jobs/scheduler.rs
//!
//! Long-running background tasks: the daily and monthly report jobs and the
//! leave-balance reconciliation sweep. Each runs until its `CancellationToken`
//! fires. A failed run is logged and the loop carries on with the next slot.

use attendance_core::{LeaveLedger, Reporter};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::jobs::schedule::{next_daily_run, next_monthly_run};

#[derive(Clone)]
pub struct JobScheduler {
    reporter: Reporter,
    ledger: LeaveLedger,
    config: Arc<Config>,
}

impl JobScheduler {
    pub fn new(reporter: Reporter, ledger: LeaveLedger, config: Arc<Config>) -> Self {
        Self {
            reporter,
            ledger,
            config,
        }
    }

    /// Starts all jobs on the current runtime.
    pub fn spawn(self, token: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(self.clone().daily_reports(token.clone())),
            tokio::spawn(self.clone().monthly_reports(token.clone())),
            tokio::spawn(self.reconcile_balances(token)),
        ]
    }

    async fn daily_reports(self, token: CancellationToken) {
        info!(at = %self.config.daily_report_at, "Daily report job scheduled");
        loop {
            let next = next_daily_run(Utc::now(), &self.config.calendar, self.config.daily_report_at);
            if !sleep_until(next, &token).await {
                break;
            }
            if let Err(e) = self.reporter.send_daily(Utc::now()).await {
                error!(error = %e, "Daily report job failed");
            }
        }
        info!("Daily report job stopped");
    }

    async fn monthly_reports(self, token: CancellationToken) {
        info!(
            day = self.config.monthly_report_day,
            at = %self.config.monthly_report_at,
            "Monthly report job scheduled"
        );
        loop {
            let Some(next) = next_monthly_run(
                Utc::now(),
                &self.config.calendar,
                self.config.monthly_report_day,
                self.config.monthly_report_at,
            ) else {
                warn!(day = self.config.monthly_report_day, "No valid monthly run date; job disabled");
                break;
            };
            if !sleep_until(next, &token).await {
                break;
            }
            if let Err(e) = self.reporter.send_monthly(Utc::now()).await {
                error!(error = %e, "Monthly report job failed");
            }
        }
        info!("Monthly report job stopped");
    }

    async fn reconcile_balances(self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.reconcile_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.ledger.reconcile_balances().await {
                error!(error = %e, "Leave balance reconciliation failed");
            }
        }
        info!("Balance reconciliation stopped");
    }
}

/// Waits until `deadline`. Returns `false` if cancelled first.
async fn sleep_until(deadline: chrono::DateTime<Utc>, token: &CancellationToken) -> bool {
    let wait = (deadline - Utc::now()).to_std().unwrap_or_default();
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(wait) => true,
    }
}
