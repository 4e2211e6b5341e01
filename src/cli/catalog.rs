use super::ui;
use crate::core::format::group_decimal;
use crate::core::storefront::Storefront;
use crate::core::{PriceFormatter, Product, ProductId, ProductRepository};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use tracing::info;

fn validate_usd(usd: f64) -> Result<f64> {
    if !usd.is_finite() || usd < 0.0 {
        bail!("Invalid USD price: {usd}");
    }
    Ok(usd)
}

async fn load(repo: &dyn ProductRepository, id: ProductId) -> Result<Product> {
    repo.get_product(id)
        .await?
        .with_context(|| format!("Product not found: {id}"))
}

pub async fn add(
    repo: &dyn ProductRepository,
    name: &str,
    usd: Option<f64>,
    draft: bool,
) -> Result<Product> {
    let usd = usd.map(validate_usd).transpose()?;
    let product = repo.create_product(name, usd, !draft).await?;
    info!(id = product.id, name, "Added product");
    println!(
        "Added product #{}: {}",
        product.id,
        ui::style_text(&product.name, ui::StyleType::TotalLabel)
    );
    Ok(product)
}

/// Admin edit of the reference price. The local price is recomputed on the
/// next update.
pub async fn set_price(repo: &dyn ProductRepository, id: ProductId, usd: f64) -> Result<()> {
    let usd = validate_usd(usd)?;
    let mut product = load(repo, id).await?;
    product.set_reference_usd_price(Some(usd));
    repo.save_product(&product).await?;

    info!(id, usd, "Updated reference price");
    println!(
        "Reference price of {} set to {usd:.2} USD. {}",
        product.name,
        ui::style_text("Run `update` to refresh local prices.", ui::StyleType::Subtle)
    );
    Ok(())
}

pub async fn list(repo: &dyn ProductRepository, formatter: &dyn PriceFormatter) -> Result<()> {
    let products = repo.list_products().await?;
    if products.is_empty() {
        println!("No products in the catalog.");
        return Ok(());
    }

    let storefront = Storefront::new(repo, formatter);
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Product"),
        ui::header_cell("Price (USD)"),
        ui::header_cell("Price"),
        ui::header_cell("Applied rate"),
        ui::header_cell("Status"),
    ]);

    for product in &products {
        let price = match storefront.catalog_price(product).await? {
            Some(view) => Cell::new(view),
            None => ui::na_cell(),
        };
        let status = if product.published {
            Cell::new("published")
        } else {
            Cell::new(ui::style_text("draft", ui::StyleType::Subtle))
        };

        table.add_row(vec![
            Cell::new(product.id),
            Cell::new(&product.name),
            ui::format_optional_cell(product.reference_usd_price, |p| format!("{p:.2}")),
            price,
            ui::format_optional_cell(product.applied_rate, group_decimal),
            status,
        ]);
    }

    println!("{}", ui::style_text("Catalog", ui::StyleType::Title));
    println!("{table}");
    Ok(())
}

/// Renders the cart line price and subtotal for `quantity` units.
pub async fn quote(
    repo: &dyn ProductRepository,
    formatter: &dyn PriceFormatter,
    id: ProductId,
    quantity: u32,
) -> Result<()> {
    if quantity == 0 {
        bail!("Quantity must be at least 1");
    }
    let product = load(repo, id).await?;
    let storefront = Storefront::new(repo, formatter);

    let (Some(unit), Some(subtotal)) = (
        storefront.cart_item_price(&product),
        storefront.cart_subtotal(&product, quantity),
    ) else {
        bail!("Product {} has no local price yet", product.name);
    };

    println!("{} x {quantity}", product.name);
    println!("  Unit price: {unit}");
    println!(
        "  {} {}",
        ui::style_text("Subtotal:", ui::StyleType::TotalLabel),
        ui::style_text(&subtotal, ui::StyleType::TotalValue)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RialFormatter;
    use crate::store::memory::MemoryProductStore;
    use anyhow::anyhow;
    use async_trait::async_trait;

    /// Store that can create products but rejects every later write.
    struct WriteOnceStore(MemoryProductStore);

    #[async_trait]
    impl ProductRepository for WriteOnceStore {
        async fn list_products(&self) -> Result<Vec<Product>> {
            self.0.list_products().await
        }
        async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
            self.0.get_product(id).await
        }
        async fn create_product(
            &self,
            name: &str,
            usd: Option<f64>,
            published: bool,
        ) -> Result<Product> {
            self.0.create_product(name, usd, published).await
        }
        async fn save_product(&self, _product: &Product) -> Result<()> {
            Err(anyhow!("read-only store"))
        }
        async fn cached_price_view(&self, id: ProductId) -> Result<Option<String>> {
            self.0.cached_price_view(id).await
        }
        async fn cache_price_view(&self, id: ProductId, view: &str) -> Result<()> {
            self.0.cache_price_view(id, view).await
        }
        async fn invalidate_price_views(&self) -> Result<()> {
            self.0.invalidate_price_views().await
        }
    }

    #[tokio::test]
    async fn test_add_draft_product() -> Result<()> {
        let store = MemoryProductStore::new();
        let product = add(&store, "Prototype", Some(5.0), true).await?;

        let stored = store.get_product(product.id).await?.unwrap();
        assert!(!stored.published);
        assert_eq!(stored.reference_usd_price, Some(5.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_draft_needs_a_single_write() -> Result<()> {
        let store = WriteOnceStore(MemoryProductStore::new());
        let product = add(&store, "Prototype", Some(5.0), true).await?;

        assert!(!product.published);
        assert!(!store.get_product(product.id).await?.unwrap().published);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_rejects_negative_price() {
        let store = MemoryProductStore::new();
        assert!(add(&store, "Broken", Some(-1.0), false).await.is_err());
        assert!(store.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_price_marks_product_stale() -> Result<()> {
        let store = MemoryProductStore::new();
        let mut product = store.insert_product("Keyboard", Some(10.0)).await?;
        product.apply_rate(50000.0);
        store.save_product(&product).await?;

        set_price(&store, product.id, 12.5).await?;

        let stored = store.get_product(product.id).await?.unwrap();
        assert_eq!(stored.reference_usd_price, Some(12.5));
        assert!(stored.applied_rate.is_none());
        assert_eq!(stored.price, Some(500000.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_price_unknown_product() {
        let store = MemoryProductStore::new();
        let err = set_price(&store, 3, 1.0).await.unwrap_err();
        assert_eq!(err.to_string(), "Product not found: 3");
    }

    #[tokio::test]
    async fn test_list_and_quote() -> Result<()> {
        let store = MemoryProductStore::new();
        let formatter = RialFormatter::default();
        let mut product = store.insert_product("Keyboard", Some(10.0)).await?;
        product.apply_rate(50000.0);
        store.save_product(&product).await?;
        store.insert_product("Gift card", None).await?;

        list(&store, &formatter).await?;
        assert_eq!(
            store.cached_price_view(product.id).await?.as_deref(),
            Some("500,000 ریال")
        );

        quote(&store, &formatter, product.id, 2).await?;
        assert!(quote(&store, &formatter, 2, 1).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_quote_rejects_zero_quantity() -> Result<()> {
        let store = MemoryProductStore::new();
        let formatter = RialFormatter::default();
        let mut product = store.insert_product("Keyboard", Some(10.0)).await?;
        product.apply_rate(50000.0);
        store.save_product(&product).await?;

        let err = quote(&store, &formatter, product.id, 0).await.unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be at least 1");

        let err = quote(&store, &formatter, 2, 0).await.unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be at least 1");
        Ok(())
    }
}
