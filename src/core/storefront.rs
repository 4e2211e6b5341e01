//! Price rendering extension points used wherever a local price is shown.
use crate::core::format::PriceFormatter;
use crate::core::product::{Product, ProductRepository};
use anyhow::Result;

pub struct Storefront<'a> {
    repo: &'a dyn ProductRepository,
    formatter: &'a dyn PriceFormatter,
}

impl<'a> Storefront<'a> {
    pub fn new(repo: &'a dyn ProductRepository, formatter: &'a dyn PriceFormatter) -> Self {
        Self { repo, formatter }
    }

    /// Catalog price of a product, memoised in the store's price-view cache.
    /// `None` when the product has no local price yet.
    pub async fn catalog_price(&self, product: &Product) -> Result<Option<String>> {
        if let Some(view) = self.repo.cached_price_view(product.id).await? {
            return Ok(Some(view));
        }
        let Some(view) = self.render(product.price) else {
            return Ok(None);
        };
        self.repo.cache_price_view(product.id, &view).await?;
        Ok(Some(view))
    }

    pub fn cart_item_price(&self, product: &Product) -> Option<String> {
        self.render(product.price)
    }

    pub fn cart_subtotal(&self, product: &Product, quantity: u32) -> Option<String> {
        self.render(product.price.map(|p| p * f64::from(quantity)))
    }

    fn render(&self, amount: Option<f64>) -> Option<String> {
        amount
            .filter(|a| *a > 0.0)
            .map(|a| self.formatter.format(a))
    }
}
