pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::export::ExportOptions;
use crate::core::schedule::{DAILY_PRICE_UPDATE_EVENT, Schedule};
use crate::core::{ProductId, RialFormatter, Trigger};
use crate::providers::exchangerate_api::ExchangeRateApiProvider;
use crate::store::DiskProductStore;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

/// Commands that need a loaded configuration.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Add {
        name: String,
        usd: Option<f64>,
        draft: bool,
    },
    SetPrice {
        id: ProductId,
        usd: f64,
    },
    List,
    Quote {
        id: ProductId,
        quantity: u32,
    },
    Update,
    Activate,
    Export {
        output: Option<PathBuf>,
    },
    Schedule,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("rialsync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = DiskProductStore::open(&config.default_data_path()?)?;
    let rates = &config.providers.exchangerate_api;
    let provider = ExchangeRateApiProvider::new(&rates.base_url, &rates.api_key);
    let formatter = RialFormatter::default();
    let schedule = Schedule::new(
        DAILY_PRICE_UPDATE_EVENT,
        chrono::Duration::hours(i64::from(config.schedule.interval_hours.max(1))),
    );

    match command {
        AppCommand::Add { name, usd, draft } => {
            cli::catalog::add(&store, &name, usd, draft).await?;
        }
        AppCommand::SetPrice { id, usd } => cli::catalog::set_price(&store, id, usd).await?,
        AppCommand::List => cli::catalog::list(&store, &formatter).await?,
        AppCommand::Quote { id, quantity } => {
            cli::catalog::quote(&store, &formatter, id, quantity).await?
        }
        AppCommand::Update => {
            cli::update::run(&store, &provider, Trigger::Manual).await?;
        }
        AppCommand::Activate => {
            cli::update::activate(&store, &provider, &schedule).await?;
        }
        AppCommand::Export { output } => {
            let options = ExportOptions {
                path: match output {
                    Some(path) => path,
                    None => config.export_path()?,
                },
                include_rate: config.export.include_rate,
                include_reference_prices: config.export.include_reference_prices,
            };
            cli::export::run(&store, &provider, &options).await?;
        }
        AppCommand::Schedule => cli::schedule::run(&store, &provider, &schedule).await?,
    }

    Ok(())
}
