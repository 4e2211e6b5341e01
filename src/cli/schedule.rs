use super::ui;
use crate::core::reconcile::update_prices;
use crate::core::schedule::Schedule;
use crate::core::{ProductRepository, RateProvider, ScheduleStore, Trigger, UpdateOutcome};
use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

/// Drives the recurring price update until Ctrl-C.
///
/// The event is registered once; restarting the process picks up the stored
/// next run instead of rescheduling. Between polls the loop sleeps until the
/// runner's next slot, or a full interval when none is known.
pub async fn run<S>(store: &S, provider: &dyn RateProvider, schedule: &Schedule) -> Result<()>
where
    S: ProductRepository + ScheduleStore,
{
    let next = schedule.ensure_scheduled(store, Utc::now()).await?;
    println!(
        "Scheduled price updates every {}h, next at {}. Press Ctrl-C to stop.",
        schedule.interval().num_hours(),
        next.to_rfc2822()
    );

    let mut runner = schedule.runner(store);
    loop {
        let ran = runner
            .poll(Utc::now(), move || async move {
                match update_prices(store, provider, Trigger::Scheduled, &|| {}).await? {
                    UpdateOutcome::Completed(report) => {
                        info!(updated = report.updated, "Scheduled update finished");
                    }
                    UpdateOutcome::Aborted { reason } => {
                        warn!(%reason, "Scheduled update skipped");
                    }
                }
                Ok(())
            })
            .await;
        if let Err(e) = ran {
            warn!(error = %e, "Scheduled update failed");
        }

        let next = runner
            .next()
            .unwrap_or_else(|| Utc::now() + schedule.interval());
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("{}", ui::style_text("Stopping scheduler.", ui::StyleType::Subtle));
                return Ok(());
            }
        }
    }
}
