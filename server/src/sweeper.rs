use crate::handler::AppModule;
use application::service::OverdueSweepService;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodically reclassifies late active loans as overdue.
pub fn spawn(module: AppModule, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match module.sweep_overdue(OffsetDateTime::now_utc()).await {
                Ok(0) => tracing::trace!("no loan became overdue"),
                Ok(count) => tracing::debug!(count, "overdue sweep finished"),
                Err(report) => tracing::error!("overdue sweep failed: {report:?}"),
            }
        }
    })
}
