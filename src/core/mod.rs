//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod export;
pub mod format;
pub mod log;
pub mod product;
pub mod reconcile;
pub mod schedule;
pub mod storefront;

// Re-export main types for cleaner imports
pub use currency::RateProvider;
pub use format::{PriceFormatter, RialFormatter};
pub use product::{Product, ProductId, ProductRepository};
pub use reconcile::{ReconcileReport, Trigger, UpdateOutcome};
pub use schedule::{Schedule, ScheduleStore};
