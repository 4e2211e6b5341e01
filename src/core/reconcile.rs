//! Keeps derived local prices in step with reference prices and the live rate.
use crate::core::currency::RateProvider;
use crate::core::product::ProductRepository;
use anyhow::{Context, Result};
use std::fmt::Display;
use tracing::{debug, error, info, instrument, warn};

/// What caused a price update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Activation,
    Scheduled,
}

impl Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Trigger::Manual => "manual",
                Trigger::Activation => "activation",
                Trigger::Scheduled => "scheduled",
            }
        )
    }
}

/// Per-pass counters. Unpublished products are not counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub rate: f64,
    pub updated: usize,
    pub unchanged: usize,
    pub missing_reference: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Completed(ReconcileReport),
    /// The exchange rate could not be fetched; no product was touched.
    Aborted { reason: String },
}

impl UpdateOutcome {
    pub fn updated(&self) -> usize {
        match self {
            UpdateOutcome::Completed(report) => report.updated,
            UpdateOutcome::Aborted { .. } => 0,
        }
    }
}

/// Recomputes the local price of every published product whose cached
/// applied rate differs from `rate`, then invalidates cached price views.
///
/// Products without a reference price are skipped. A failed write is logged
/// and counted, and the pass moves on to the next product.
pub async fn reconcile(
    repo: &dyn ProductRepository,
    rate: f64,
    progress: &(dyn Fn() + Sync),
) -> Result<ReconcileReport> {
    let products = repo
        .list_products()
        .await
        .context("Failed to load products")?;

    let mut report = ReconcileReport {
        rate,
        ..Default::default()
    };

    for mut product in products.into_iter().filter(|p| p.published) {
        if product.reference_usd_price.is_none() {
            debug!(id = product.id, "No reference price, skipping");
            report.missing_reference += 1;
        } else if !product.is_stale(rate) {
            report.unchanged += 1;
        } else {
            let target = product.apply_rate(rate);
            match repo.save_product(&product).await {
                Ok(()) => {
                    debug!(id = product.id, ?target, rate, "Updated local price");
                    report.updated += 1;
                }
                Err(e) => {
                    warn!(id = product.id, error = %e, "Failed to save product");
                    report.failed += 1;
                }
            }
        }
        progress();
    }

    repo.invalidate_price_views()
        .await
        .context("Failed to invalidate cached price views")?;

    Ok(report)
}

/// Fetches the rate once and reconciles the catalog with it.
///
/// A failed fetch is not an error: it is logged and reported as
/// `UpdateOutcome::Aborted`. `Err` means the product store itself failed.
#[instrument(name = "UpdatePrices", skip_all, fields(trigger = %trigger))]
pub async fn update_prices(
    repo: &dyn ProductRepository,
    provider: &dyn RateProvider,
    trigger: Trigger,
    progress: &(dyn Fn() + Sync),
) -> Result<UpdateOutcome> {
    let rate = match provider.fetch_rate().await {
        Ok(rate) => rate,
        Err(e) => {
            error!(error = %e, "Failed to retrieve the USD exchange rate");
            return Ok(UpdateOutcome::Aborted {
                reason: e.to_string(),
            });
        }
    };

    let report = reconcile(repo, rate, progress).await?;
    info!(
        rate,
        updated = report.updated,
        unchanged = report.unchanged,
        missing_reference = report.missing_reference,
        failed = report.failed,
        "Product prices updated"
    );
    Ok(UpdateOutcome::Completed(report))
}
