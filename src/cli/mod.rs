//! Command-line interface definitions (clap).

pub mod formatters;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "etfolio")]
#[command(about = "ETF portfolio and asset tracker", version)]
pub struct Cli {
    /// Database file (default: ~/.etfolio/data.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database schema
    Init,

    /// Manage buy/sell transactions
    #[command(subcommand)]
    Tx(TxCommands),

    /// Manage current market values for open positions
    #[command(subcommand)]
    Value(ValueCommands),

    /// Manage non-ETF assets (cash, crypto, CDs, pension funds)
    #[command(subcommand)]
    Asset(AssetCommands),

    /// Manage the instrument registry (display names per ISIN)
    #[command(subcommand)]
    Instrument(InstrumentCommands),

    /// Portfolio summary with holdings and closed positions
    Portfolio {
        /// Emit JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Cost basis for one instrument
    CostBasis {
        /// Instrument ISIN
        isin: String,
        /// Only count transactions up to this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<chrono::NaiveDate>,
    },

    /// Capture and inspect asset snapshots
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// CZK/EUR exchange rate setting
    #[command(subcommand)]
    Rate(RateCommands),

    /// Import CSV files
    #[command(subcommand)]
    Import(ImportCommands),
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction
    Add {
        #[arg(long)]
        date: chrono::NaiveDate,
        #[arg(long)]
        isin: String,
        #[arg(long, default_value = "DEGIRO")]
        broker: String,
        /// BUY or SELL
        #[arg(long = "type")]
        transaction_type: String,
        #[arg(long)]
        units: rust_decimal::Decimal,
        #[arg(long)]
        price: rust_decimal::Decimal,
        #[arg(long, default_value = "0")]
        fee: rust_decimal::Decimal,
    },
    /// Update fields of a transaction
    Update {
        id: i64,
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
        #[arg(long)]
        isin: Option<String>,
        #[arg(long)]
        broker: Option<String>,
        #[arg(long = "type")]
        transaction_type: Option<String>,
        #[arg(long)]
        units: Option<rust_decimal::Decimal>,
        #[arg(long)]
        price: Option<rust_decimal::Decimal>,
        #[arg(long)]
        fee: Option<rust_decimal::Decimal>,
    },
    /// Delete a transaction
    Delete { id: i64 },
    /// Show one transaction
    Show { id: i64 },
    /// List transactions
    List {
        #[arg(long)]
        isin: Option<String>,
        #[arg(long)]
        broker: Option<String>,
        /// BUY or SELL
        #[arg(long = "type")]
        transaction_type: Option<String>,
        #[arg(long)]
        from: Option<chrono::NaiveDate>,
        #[arg(long)]
        to: Option<chrono::NaiveDate>,
        /// Sort by "date" or "created"
        #[arg(long, default_value = "date")]
        sort: String,
        /// Oldest first instead of newest first
        #[arg(long)]
        asc: bool,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum ValueCommands {
    /// Set the current market value of an open position
    Set {
        isin: String,
        value: rust_decimal::Decimal,
    },
    /// List stored market values
    List,
    /// Remove a stored market value
    Delete { isin: String },
}

#[derive(Subcommand)]
pub enum AssetCommands {
    /// Create or update an asset
    Set {
        /// crypto, cash_eur, cash_czk, cd_account or pension_fund
        #[arg(long = "type")]
        asset_type: String,
        /// Account name (cash assets only)
        #[arg(long)]
        detail: Option<String>,
        /// EUR or CZK
        #[arg(long)]
        currency: String,
        #[arg(long)]
        value: rust_decimal::Decimal,
    },
    /// List assets including the computed investments total
    List,
    /// Delete an asset
    Delete {
        #[arg(long = "type")]
        asset_type: String,
        #[arg(long)]
        detail: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum InstrumentCommands {
    /// Register an instrument; fails when the ISIN is already known
    Add {
        isin: String,
        #[arg(long)]
        name: String,
        /// STOCK, BOND or REAL_ASSET
        #[arg(long)]
        kind: String,
    },
    /// Register or overwrite an instrument
    Set {
        isin: String,
        #[arg(long)]
        name: String,
        /// STOCK, BOND or REAL_ASSET
        #[arg(long)]
        kind: String,
    },
    /// Update fields of a registration
    Update {
        isin: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        kind: Option<String>,
    },
    /// List registered instruments
    List {
        /// Filter by STOCK, BOND or REAL_ASSET
        #[arg(long)]
        kind: Option<String>,
    },
    /// Show one registration
    Show { isin: String },
    /// Remove a registration
    Delete { isin: String },
}

#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Capture all assets as one snapshot
    Create {
        /// Snapshot datetime (default: now)
        #[arg(long)]
        date: Option<chrono::NaiveDateTime>,
    },
    /// List snapshot rows
    List {
        #[arg(long)]
        from: Option<chrono::NaiveDateTime>,
        #[arg(long)]
        to: Option<chrono::NaiveDateTime>,
        #[arg(long = "type")]
        asset_type: Option<String>,
    },
    /// Per-date totals, breakdowns and trend
    Summary {
        #[arg(long)]
        from: Option<chrono::NaiveDateTime>,
        #[arg(long)]
        to: Option<chrono::NaiveDateTime>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Delete the snapshot taken at an exact datetime
    Delete { date: chrono::NaiveDateTime },
    /// Delete the entire snapshot history
    DeleteAll {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum RateCommands {
    /// Show the CZK-per-EUR rate in effect
    Show,
    /// Store a new CZK-per-EUR rate
    Set { rate: rust_decimal::Decimal },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import a DEGIRO transaction export
    Degiro { file: PathBuf },
    /// Import historical snapshot rows
    Snapshots { file: PathBuf },
}
