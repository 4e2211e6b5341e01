use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rialsync::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for rialsync::AppCommand {
    fn from(cmd: Commands) -> rialsync::AppCommand {
        match cmd {
            Commands::Add { name, usd, draft } => rialsync::AppCommand::Add { name, usd, draft },
            Commands::SetPrice { id, usd } => rialsync::AppCommand::SetPrice { id, usd },
            Commands::List => rialsync::AppCommand::List,
            Commands::Quote { id, quantity } => rialsync::AppCommand::Quote { id, quantity },
            Commands::Update => rialsync::AppCommand::Update,
            Commands::Activate => rialsync::AppCommand::Activate,
            Commands::Export { output } => rialsync::AppCommand::Export { output },
            Commands::Schedule => rialsync::AppCommand::Schedule,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Add a product to the catalog
    Add {
        name: String,
        /// Reference price in USD
        #[arg(long)]
        usd: Option<f64>,
        /// Keep the product out of updates and exports
        #[arg(long)]
        draft: bool,
    },
    /// Change the USD reference price of a product
    SetPrice { id: u64, usd: f64 },
    /// Display the catalog with local prices
    List,
    /// Display cart price and subtotal for a product
    Quote {
        id: u64,
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },
    /// Update local prices from the current exchange rate
    Update,
    /// Update all prices and register the daily update
    Activate,
    /// Update prices and export the price list to a text file
    Export {
        /// Output file, defaults to the configured export path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the recurring price update until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => rialsync::cli::setup::setup(),
        Some(cmd) => rialsync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
