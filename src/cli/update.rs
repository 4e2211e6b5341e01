use super::ui;
use crate::core::reconcile::{ReconcileReport, update_prices};
use crate::core::currency::{BASE_CURRENCY, LOCAL_CURRENCY};
use crate::core::format::group_decimal;
use crate::core::schedule::Schedule;
use crate::core::{ProductRepository, RateProvider, ScheduleStore, Trigger, UpdateOutcome};
use anyhow::{Result, bail};
use chrono::Utc;

/// Runs one reconciliation pass with a progress bar and prints the result.
/// An unavailable exchange rate is reported as an error.
pub async fn run(
    repo: &dyn ProductRepository,
    provider: &dyn RateProvider,
    trigger: Trigger,
) -> Result<ReconcileReport> {
    let total = repo
        .list_products()
        .await?
        .iter()
        .filter(|p| p.published)
        .count();
    let pb = ui::new_progress_bar(total as u64);
    pb.set_message("Updating prices...");

    let outcome = update_prices(repo, provider, trigger, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    match outcome? {
        UpdateOutcome::Completed(report) => {
            print_report(&report);
            Ok(report)
        }
        UpdateOutcome::Aborted { reason } => {
            bail!("Exchange rate unavailable, no prices were changed: {reason}")
        }
    }
}

/// One-time activation: register the recurring update if it is not
/// registered yet, then bring every price up to date. The schedule is kept
/// even when the exchange rate cannot be fetched.
pub async fn activate<S>(
    store: &S,
    provider: &dyn RateProvider,
    schedule: &Schedule,
) -> Result<ReconcileReport>
where
    S: ProductRepository + ScheduleStore,
{
    let next = schedule.ensure_scheduled(store, Utc::now()).await?;
    let report = run(store, provider, Trigger::Activation).await;
    println!(
        "{}",
        ui::style_text(
            &format!("Next scheduled update: {}", next.to_rfc2822()),
            ui::StyleType::Subtle
        )
    );
    report
}

fn rate_line(report: &ReconcileReport) -> String {
    format!(
        "1 {BASE_CURRENCY} = {} {LOCAL_CURRENCY}",
        group_decimal(report.rate)
    )
}

fn print_report(report: &ReconcileReport) {
    println!(
        "{} {}",
        ui::style_text("Exchange rate:", ui::StyleType::TotalLabel),
        ui::style_text(&rate_line(report), ui::StyleType::TotalValue)
    );
    println!(
        "Updated: {}  Unchanged: {}  Without USD price: {}",
        report.updated, report.unchanged, report.missing_reference
    );
    if report.failed > 0 {
        println!(
            "{}",
            ui::style_text(
                &format!("Failed to save {} product(s)", report.failed),
                ui::StyleType::Error
            )
        );
    }
}
