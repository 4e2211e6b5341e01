//! Exchange rate abstractions

use anyhow::Result;
use async_trait::async_trait;

/// Currency the admin enters reference prices in.
pub const BASE_CURRENCY: &str = "USD";
/// Currency the catalog is sold in.
pub const LOCAL_CURRENCY: &str = "IRR";

/// Source of the current `BASE_CURRENCY` to `LOCAL_CURRENCY` rate.
///
/// Implementations perform a single attempt per call and never cache; a
/// failed lookup is reported as `Err`.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rate(&self) -> Result<f64>;
}
