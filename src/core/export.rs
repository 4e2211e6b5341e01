//! Plain-text price list export.
use crate::core::currency::{BASE_CURRENCY, LOCAL_CURRENCY, RateProvider};
use crate::core::format::group_decimal;
use crate::core::product::{Product, ProductRepository};
use crate::core::reconcile::reconcile;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub path: PathBuf,
    pub include_rate: bool,
    pub include_reference_prices: bool,
}

impl ExportOptions {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            include_rate: true,
            include_reference_prices: true,
        }
    }
}

/// Reconciles the catalog against a freshly fetched rate and writes the
/// resulting price list, replacing any previous export at the same path.
#[instrument(name = "ExportPrices", skip_all, fields(path = %options.path.display()))]
pub async fn export_prices(
    repo: &dyn ProductRepository,
    provider: &dyn RateProvider,
    options: &ExportOptions,
) -> Result<PathBuf> {
    let rate = provider.fetch_rate().await.inspect_err(|e| {
        error!(error = %e, "Failed to retrieve the USD exchange rate");
    })?;

    reconcile(repo, rate, &|| {}).await?;

    let products: Vec<Product> = repo
        .list_products()
        .await
        .context("Failed to load products")?
        .into_iter()
        .filter(|p| p.published)
        .collect();

    let contents = render_price_list(&products, rate, options);
    write_artifact(&options.path, &contents).inspect_err(|e| {
        error!(error = %e, "Failed to create the export file");
    })?;

    info!(products = products.len(), "Exported product prices");
    Ok(options.path.clone())
}

pub fn render_price_list(products: &[Product], rate: f64, options: &ExportOptions) -> String {
    let mut out = String::new();

    if options.include_rate {
        let _ = writeln!(
            out,
            "Exchange rate: 1 {BASE_CURRENCY} = {} {LOCAL_CURRENCY}\n",
            group_decimal(rate)
        );
    }

    for product in products {
        let price = product
            .regular_price
            .map_or("N/A".to_string(), |p| format!("{p:.0}"));
        let _ = writeln!(out, "{}: {price} {LOCAL_CURRENCY}", product.name);
    }

    if options.include_reference_prices {
        let _ = writeln!(out, "\nOriginal {BASE_CURRENCY} prices:");
        for product in products {
            let usd = product
                .reference_usd_price
                .map_or("N/A".to_string(), |p| format!("{p:.2}"));
            let _ = writeln!(out, "{}: {usd} {BASE_CURRENCY}", product.name);
        }
    }

    out
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write export file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log::capture::CapturedLogs;
    use crate::store::memory::MemoryProductStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedRate(f64);

    #[async_trait]
    impl RateProvider for FixedRate {
        async fn fetch_rate(&self) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FailingRate;

    #[async_trait]
    impl RateProvider for FailingRate {
        async fn fetch_rate(&self) -> Result<f64> {
            Err(anyhow!("No IRR rate in response"))
        }
    }

    async fn seeded_store() -> MemoryProductStore {
        let store = MemoryProductStore::new();
        store.insert_product("Keyboard", Some(10.0)).await.unwrap();
        store.insert_product("Gift card", None).await.unwrap();
        let mut draft = store.insert_product("Prototype", Some(1.0)).await.unwrap();
        draft.published = false;
        store.save_product(&draft).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_export_reconciles_and_writes_list() -> Result<()> {
        let dir = TempDir::new()?;
        let store = seeded_store().await;
        let options = ExportOptions::new(dir.path().join("uploads/product_prices_list.txt"));

        let path = export_prices(&store, &FixedRate(50000.0), &options).await?;

        assert_eq!(path, options.path);
        let contents = std::fs::read_to_string(&path)?;
        assert_eq!(
            contents,
            "Exchange rate: 1 USD = 50,000 IRR\n\n\
             Keyboard: 500000 IRR\n\
             Gift card: N/A IRR\n\
             \n\
             Original USD prices:\n\
             Keyboard: 10.00 USD\n\
             Gift card: N/A USD\n"
        );

        let keyboard = store.get_product(1).await?.unwrap();
        assert_eq!(keyboard.applied_rate, Some(50000.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_export_overwrites_previous_file() -> Result<()> {
        let dir = TempDir::new()?;
        let store = seeded_store().await;
        let mut options = ExportOptions::new(dir.path().join("prices.txt"));
        options.include_rate = false;
        options.include_reference_prices = false;
        std::fs::write(&options.path, "old contents that are much longer than the new ones\n")?;

        export_prices(&store, &FixedRate(2.0), &options).await?;

        let contents = std::fs::read_to_string(&options.path)?;
        assert_eq!(contents, "Keyboard: 20 IRR\nGift card: N/A IRR\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_export_header_keeps_fractional_rate() -> Result<()> {
        let dir = TempDir::new()?;
        let store = MemoryProductStore::new();
        store.insert_product("Keyboard", Some(2.0)).await?;
        let mut options = ExportOptions::new(dir.path().join("prices.txt"));
        options.include_reference_prices = false;

        export_prices(&store, &FixedRate(42075.5), &options).await?;

        let contents = std::fs::read_to_string(&options.path)?;
        assert_eq!(
            contents,
            "Exchange rate: 1 USD = 42,075.5 IRR\n\nKeyboard: 84151 IRR\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_export_logs_rate_failure_once() -> Result<()> {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let dir = TempDir::new()?;
        let store = seeded_store().await;
        let options = ExportOptions::new(dir.path().join("prices.txt"));

        assert!(export_prices(&store, &FailingRate, &options).await.is_err());

        assert_eq!(logs.count("Failed to retrieve the USD exchange rate"), 1);
        assert_eq!(logs.count("Failed to create the export file"), 0);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_export_aborts_without_rate() -> Result<()> {
        let dir = TempDir::new()?;
        let store = seeded_store().await;
        let options = ExportOptions::new(dir.path().join("prices.txt"));

        let result = export_prices(&store, &FailingRate, &options).await;

        assert!(result.is_err());
        assert!(!options.path.exists());
        assert!(store.get_product(1).await?.unwrap().price.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_export_fails_when_artifact_cannot_be_created() -> Result<()> {
        let dir = TempDir::new()?;
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "")?;
        let store = seeded_store().await;
        let options = ExportOptions::new(blocker.join("prices.txt"));

        let result = export_prices(&store, &FixedRate(50000.0), &options).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to create directory"));
        Ok(())
    }
}
