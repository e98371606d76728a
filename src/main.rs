mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init(cli.db),
        Commands::Tx(cmd) => commands::tx(cli.db, cmd),
        Commands::Value(cmd) => commands::value(cli.db, cmd),
        Commands::Asset(cmd) => commands::asset(cli.db, cmd),
        Commands::Instrument(cmd) => commands::instrument(cli.db, cmd),
        Commands::Portfolio { json } => commands::portfolio(cli.db, json),
        Commands::CostBasis { isin, as_of } => commands::cost_basis(cli.db, isin, as_of),
        Commands::Snapshot(cmd) => commands::snapshot(cli.db, cmd),
        Commands::Rate(cmd) => commands::rate(cli.db, cmd),
        Commands::Import(cmd) => commands::import(cli.db, cmd),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
