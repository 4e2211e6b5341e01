use super::ui;
use crate::core::export::{ExportOptions, export_prices};
use crate::core::{ProductRepository, RateProvider};
use anyhow::Result;
use std::path::PathBuf;

pub async fn run(
    repo: &dyn ProductRepository,
    provider: &dyn RateProvider,
    options: &ExportOptions,
) -> Result<PathBuf> {
    let path = export_prices(repo, provider, options).await?;
    let absolute = std::path::absolute(&path).unwrap_or_else(|_| path.clone());

    println!(
        "{}",
        ui::style_text("Product prices exported successfully.", ui::StyleType::TotalValue)
    );
    println!("Download the file here: file://{}", absolute.display());
    Ok(path)
}
