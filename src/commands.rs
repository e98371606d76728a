//! Command handlers: open the database, call into the library, print.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use colored::Colorize;
use rust_decimal::Decimal;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use etfolio::analytics::{self, CostBasis};
use etfolio::db::{self, SortField, TransactionFilter, TransactionType};
use etfolio::db::{AssetType, Currency, InstrumentKind};
use etfolio::error::{Result, TrackerError};
use etfolio::isin::normalize_isin;
use etfolio::{assets, importers, instruments, snapshots, transactions};

use crate::cli::formatters::{money, opt_money, pl, pl_pct};
use crate::cli::{
    AssetCommands, ImportCommands, InstrumentCommands, RateCommands, SnapshotCommands, TxCommands,
    ValueCommands,
};

fn parse_type(raw: &str) -> Result<TransactionType> {
    TransactionType::from_str(raw)
        .map_err(|_| TrackerError::Validation(format!("invalid type '{}', use BUY or SELL", raw)).into())
}

fn parse_asset_type(raw: &str) -> Result<AssetType> {
    AssetType::from_str(raw)
        .map_err(|_| TrackerError::Validation(format!("unknown asset type '{}'", raw)).into())
}

fn parse_currency(raw: &str) -> Result<Currency> {
    Currency::from_str(raw)
        .map_err(|_| TrackerError::Validation(format!("unknown currency '{}', use EUR or CZK", raw)).into())
}

fn parse_kind(raw: &str) -> Result<InstrumentKind> {
    InstrumentKind::from_str(raw).map_err(|_| {
        TrackerError::Validation(format!(
            "unknown kind '{}', use STOCK, BOND or REAL_ASSET",
            raw
        ))
        .into()
    })
}

pub fn init(db_path: Option<PathBuf>) -> Result<()> {
    db::init_database(db_path)?;
    println!("Database initialized.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct TxRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "ISIN")]
    isin: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Units")]
    units: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Fee")]
    fee: String,
    #[tabled(rename = "Broker")]
    broker: String,
}

impl TxRow {
    fn new(tx: &db::Transaction, names: &HashMap<String, String>) -> Self {
        TxRow {
            id: tx.id.map(|id| id.to_string()).unwrap_or_default(),
            date: tx.date.to_string(),
            isin: tx.isin.clone(),
            name: names.get(&tx.isin).cloned().unwrap_or_else(|| "-".to_string()),
            kind: tx.transaction_type.as_str().to_string(),
            units: tx.units.to_string(),
            price: money(tx.price_per_unit),
            fee: money(tx.fee),
            broker: tx.broker.clone(),
        }
    }
}

pub fn tx(db_path: Option<PathBuf>, cmd: TxCommands) -> Result<()> {
    let conn = db::open_db(db_path)?;

    match cmd {
        TxCommands::Add {
            date,
            isin,
            broker,
            transaction_type,
            units,
            price,
            fee,
        } => {
            let created = transactions::create_transaction(
                &conn,
                &transactions::NewTransaction {
                    date,
                    isin,
                    broker,
                    fee,
                    price_per_unit: price,
                    units,
                    transaction_type: parse_type(&transaction_type)?,
                },
            )?;
            println!(
                "Recorded {} {} x {} @ {} (id {})",
                created.transaction_type.as_str(),
                created.units,
                created.isin,
                money(created.price_per_unit),
                created.id.unwrap_or_default()
            );
        }
        TxCommands::Update {
            id,
            date,
            isin,
            broker,
            transaction_type,
            units,
            price,
            fee,
        } => {
            let transaction_type = transaction_type.as_deref().map(parse_type).transpose()?;
            let updated = transactions::update_transaction(
                &conn,
                id,
                &transactions::TransactionPatch {
                    date,
                    isin,
                    broker,
                    fee,
                    price_per_unit: price,
                    units,
                    transaction_type,
                },
            )?;
            println!("Updated transaction {}", updated.id.unwrap_or(id));
        }
        TxCommands::Delete { id } => {
            transactions::delete_transaction(&conn, id)?;
            println!("Deleted transaction {}", id);
        }
        TxCommands::Show { id } => {
            let tx = db::get_transaction(&conn, id)?
                .ok_or_else(|| TrackerError::NotFound(format!("transaction {}", id)))?;
            let names = instruments::instrument_names(&conn)?;
            let table = Table::new([TxRow::new(&tx, &names)])
                .with(Style::sharp())
                .to_string();
            println!("{}", table);
            println!("Created: {}", tx.created_at);
        }
        TxCommands::List {
            isin,
            broker,
            transaction_type,
            from,
            to,
            sort,
            asc,
            offset,
            limit,
        } => {
            let sort_by = match sort.as_str() {
                "date" => SortField::Date,
                "created" => SortField::CreatedAt,
                other => {
                    return Err(TrackerError::Validation(format!(
                        "invalid sort '{}', use date or created",
                        other
                    ))
                    .into())
                }
            };
            let transaction_type = transaction_type.as_deref().map(parse_type).transpose()?;
            let filter = TransactionFilter {
                isin,
                broker,
                transaction_type,
                start_date: from,
                end_date: to,
                sort_by,
                sort_desc: !asc,
                offset,
                limit,
            };
            let (rows, total) = db::list_transactions(&conn, &filter)?;
            if rows.is_empty() {
                println!("No transactions found.");
            } else {
                let names = instruments::instrument_names(&conn)?;
                let table = Table::new(rows.iter().map(|tx| TxRow::new(tx, &names)))
                    .with(Style::sharp())
                    .to_string();
                println!("{}", table);
                println!("{} of {} transactions", rows.len(), total);
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Position values
// ---------------------------------------------------------------------------

pub fn value(db_path: Option<PathBuf>, cmd: ValueCommands) -> Result<()> {
    let conn = db::open_db(db_path)?;

    match cmd {
        ValueCommands::Set { isin, value } => {
            let isin = normalize_isin(&isin).map_err(TrackerError::Validation)?;
            if value < Decimal::ZERO {
                return Err(
                    TrackerError::Validation("value must not be negative".into()).into(),
                );
            }
            let pv = db::upsert_position_value(&conn, &isin, value)?;
            println!("{} valued at {}", pv.isin, money(pv.current_value));
        }
        ValueCommands::List => {
            let values = db::all_position_values(&conn)?;
            if values.is_empty() {
                println!("No position values stored.");
            } else {
                for pv in values {
                    println!("{}  {}  (updated {})", pv.isin, money(pv.current_value), pv.updated_at);
                }
            }
        }
        ValueCommands::Delete { isin } => {
            let isin = normalize_isin(&isin).map_err(TrackerError::Validation)?;
            if db::delete_position_value(&conn, &isin)? {
                println!("Removed value for {}", isin);
            } else {
                return Err(TrackerError::NotFound(format!("position value for {}", isin)).into());
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Other assets
// ---------------------------------------------------------------------------

pub fn asset(db_path: Option<PathBuf>, cmd: AssetCommands) -> Result<()> {
    let conn = db::open_db(db_path)?;

    match cmd {
        AssetCommands::Set {
            asset_type,
            detail,
            currency,
            value,
        } => {
            let stored = assets::upsert_other_asset(
                &conn,
                &assets::NewOtherAsset {
                    asset_type: parse_asset_type(&asset_type)?,
                    asset_detail: detail,
                    currency: parse_currency(&currency)?,
                    value,
                },
            )?;
            println!(
                "{} {} = {} {}",
                stored.asset_type.as_str(),
                stored.asset_detail.as_deref().unwrap_or("-"),
                money(stored.value),
                stored.currency.as_str()
            );
        }
        AssetCommands::List => {
            let (captured, rate) = assets::capture_assets(&conn)?;
            println!("Exchange rate: {} CZK/EUR", rate);
            for asset in &captured {
                let value_eur =
                    snapshots::value_in_eur(asset.value(), asset.currency().as_str(), rate);
                let marker = match asset {
                    assets::CapturedAsset::Computed { .. } => " (computed)",
                    assets::CapturedAsset::Stored(_) => "",
                };
                println!(
                    "{:<14} {:<10} {:>12} {}  ({} EUR){}",
                    asset.asset_type_str(),
                    asset.asset_detail().unwrap_or("-"),
                    money(asset.value()),
                    asset.currency().as_str(),
                    money(value_eur),
                    marker
                );
            }
        }
        AssetCommands::Delete { asset_type, detail } => {
            let asset_type = parse_asset_type(&asset_type)?;
            assets::delete_other_asset(&conn, asset_type, detail.as_deref())?;
            println!("Deleted {} {}", asset_type.as_str(), detail.as_deref().unwrap_or("-"));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Instrument registry
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct InstrumentRow {
    #[tabled(rename = "ISIN")]
    isin: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
}

impl From<&db::IsinMetadata> for InstrumentRow {
    fn from(metadata: &db::IsinMetadata) -> Self {
        InstrumentRow {
            isin: metadata.isin.clone(),
            name: metadata.name.clone(),
            kind: metadata.kind.as_str().to_string(),
        }
    }
}

pub fn instrument(db_path: Option<PathBuf>, cmd: InstrumentCommands) -> Result<()> {
    let conn = db::open_db(db_path)?;

    match cmd {
        InstrumentCommands::Add { isin, name, kind } => {
            let registered = instruments::register_instrument(
                &conn,
                &instruments::NewInstrument {
                    isin,
                    name,
                    kind: parse_kind(&kind)?,
                },
            )?;
            println!("Registered {} as '{}'", registered.isin, registered.name);
        }
        InstrumentCommands::Set { isin, name, kind } => {
            let stored = instruments::upsert_instrument(
                &conn,
                &instruments::NewInstrument {
                    isin,
                    name,
                    kind: parse_kind(&kind)?,
                },
            )?;
            println!("{} = '{}' ({})", stored.isin, stored.name, stored.kind.as_str());
        }
        InstrumentCommands::Update { isin, name, kind } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let updated = instruments::update_instrument(
                &conn,
                &isin,
                &instruments::InstrumentPatch { name, kind },
            )?;
            println!("{} = '{}' ({})", updated.isin, updated.name, updated.kind.as_str());
        }
        InstrumentCommands::List { kind } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let rows = instruments::list_instruments(&conn, kind)?;
            if rows.is_empty() {
                println!("No instruments registered.");
            } else {
                let table = Table::new(rows.iter().map(InstrumentRow::from))
                    .with(Style::sharp())
                    .to_string();
                println!("{}", table);
            }
        }
        InstrumentCommands::Show { isin } => {
            let metadata = instruments::get_instrument(&conn, &isin)?;
            let table = Table::new([InstrumentRow::from(&metadata)])
                .with(Style::sharp())
                .to_string();
            println!("{}", table);
            println!("Created: {}  Updated: {}", metadata.created_at, metadata.updated_at);
        }
        InstrumentCommands::Delete { isin } => {
            instruments::delete_instrument(&conn, &isin)?;
            println!("Removed registration for {}", isin.to_uppercase());
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Portfolio / cost basis
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "ISIN")]
    isin: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Units")]
    units: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Gains")]
    gains: String,
    #[tabled(rename = "Fees")]
    fees: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "P/L")]
    pl: String,
    #[tabled(rename = "P/L %")]
    pl_pct: String,
}

impl PositionRow {
    fn new(basis: &CostBasis, names: &HashMap<String, String>) -> Self {
        PositionRow {
            isin: basis.isin.clone(),
            name: names.get(&basis.isin).cloned().unwrap_or_else(|| "-".to_string()),
            units: basis.total_units.to_string(),
            cost: money(basis.total_cost_without_fees),
            gains: money(basis.total_gains_without_fees),
            fees: money(basis.total_fees),
            value: opt_money(basis.current_value),
            pl: pl(basis.absolute_pl_with_fees),
            pl_pct: pl_pct(basis.percentage_pl_with_fees),
        }
    }
}

pub fn portfolio(db_path: Option<PathBuf>, json: bool) -> Result<()> {
    let conn = db::open_db(db_path)?;
    let summary = analytics::portfolio_summary_for(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "Portfolio".bold());
    println!("  Invested:   {}", money(summary.total_invested));
    println!("  Withdrawn:  {}", money(summary.total_withdrawn));
    println!("  Fees:       {}", money(summary.total_fees));
    println!(
        "  Value:      {}",
        money(summary.total_current_portfolio_invested_value)
    );
    println!("  P/L:        {}", pl(Some(summary.total_profit_loss)));

    let names = instruments::instrument_names(&conn)?;
    if !summary.holdings.is_empty() {
        println!("\n{}", "Holdings".bold());
        let table = Table::new(summary.holdings.iter().map(|b| PositionRow::new(b, &names)))
            .with(Style::sharp())
            .to_string();
        println!("{}", table);
    }
    if !summary.closed_positions.is_empty() {
        println!("\n{}", "Closed positions".bold());
        let table = Table::new(
            summary
                .closed_positions
                .iter()
                .map(|b| PositionRow::new(b, &names)),
        )
        .with(Style::sharp())
        .to_string();
        println!("{}", table);
    }

    Ok(())
}

pub fn cost_basis(
    db_path: Option<PathBuf>,
    isin: String,
    as_of: Option<chrono::NaiveDate>,
) -> Result<()> {
    let conn = db::open_db(db_path)?;
    let isin = normalize_isin(&isin).map_err(TrackerError::Validation)?;

    match analytics::cost_basis_for(&conn, &isin, as_of)? {
        None => println!("No transactions for {}", isin),
        Some(basis) => {
            println!("{}", basis.isin.bold());
            println!("  Units:        {}", basis.total_units);
            println!("  Cost:         {}", money(basis.total_cost_without_fees));
            println!("  Gains:        {}", money(basis.total_gains_without_fees));
            println!("  Fees:         {}", money(basis.total_fees));
            println!("  Transactions: {}", basis.transaction_count);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Type")]
    asset_type: String,
    #[tabled(rename = "Detail")]
    detail: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Currency")]
    currency: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Value EUR")]
    value_eur: String,
}

impl From<&db::AssetSnapshot> for SnapshotRow {
    fn from(row: &db::AssetSnapshot) -> Self {
        SnapshotRow {
            date: row.snapshot_date.to_string(),
            asset_type: row.asset_type.clone(),
            detail: row.asset_detail.clone().unwrap_or_else(|| "-".to_string()),
            value: money(row.value),
            currency: row.currency.clone(),
            rate: row.exchange_rate.to_string(),
            value_eur: money(row.value_eur),
        }
    }
}

pub fn snapshot(db_path: Option<PathBuf>, cmd: SnapshotCommands) -> Result<()> {
    let mut conn = db::open_db(db_path)?;

    match cmd {
        SnapshotCommands::Create { date } => {
            let (rows, metadata) = snapshots::create_snapshot(&mut conn, date)?;
            println!(
                "Captured {} assets at {} (rate {} CZK/EUR), total {} EUR",
                metadata.total_assets_captured,
                metadata.snapshot_date,
                metadata.exchange_rate_used,
                money(metadata.total_value_eur)
            );
            let table = Table::new(rows.iter().map(SnapshotRow::from))
                .with(Style::sharp())
                .to_string();
            println!("{}", table);
        }
        SnapshotCommands::List { from, to, asset_type } => {
            let rows = snapshots::get_snapshots(&conn, from, to, asset_type.as_deref())?;
            if rows.is_empty() {
                println!("No snapshots found.");
            } else {
                let table = Table::new(rows.iter().map(SnapshotRow::from))
                    .with(Style::sharp())
                    .to_string();
                println!("{}", table);
            }
        }
        SnapshotCommands::Summary { from, to, json } => {
            let rows = snapshots::get_snapshots(&conn, from, to, None)?;
            let trend = snapshots::summarize_snapshots(&rows);
            if json {
                println!("{}", serde_json::to_string_pretty(&trend)?);
                return Ok(());
            }
            if trend.summaries.is_empty() {
                println!("No snapshots found.");
                return Ok(());
            }
            for s in &trend.summaries {
                println!(
                    "{}  total {} EUR  (rate {}, change {} / {}%)",
                    s.snapshot_date,
                    money(s.total_value_eur),
                    s.exchange_rate_used,
                    money(s.absolute_change_from_oldest),
                    s.percentage_change_from_oldest.round_dp(2)
                );
                for (currency, total) in &s.by_currency {
                    println!("    {:<12} {}", currency, money(*total));
                }
                for (asset_type, total) in &s.by_asset_type {
                    println!("    {:<12} {} EUR", asset_type, money(*total));
                }
            }
            println!("Avg monthly increment: {} EUR", trend.avg_monthly_increment);
        }
        SnapshotCommands::Delete { date } => {
            let deleted = snapshots::delete_snapshots_by_date(&conn, date)?;
            println!("Deleted {} rows at {}", deleted, date);
        }
        SnapshotCommands::DeleteAll { yes } => {
            if !yes {
                return Err(TrackerError::Validation(
                    "refusing to delete the snapshot history without --yes".into(),
                )
                .into());
            }
            let deleted = snapshots::delete_all_snapshots(&conn)?;
            println!("Deleted {} snapshot rows", deleted);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Exchange rate
// ---------------------------------------------------------------------------

pub fn rate(db_path: Option<PathBuf>, cmd: RateCommands) -> Result<()> {
    let conn = db::open_db(db_path)?;

    match cmd {
        RateCommands::Show => {
            println!("{} CZK/EUR", db::get_exchange_rate(&conn)?);
        }
        RateCommands::Set { rate } => {
            db::set_exchange_rate(&conn, rate)?;
            println!("Exchange rate set to {} CZK/EUR", rate);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

fn print_report(report: &importers::ImportReport) {
    if report.rolled_back() {
        println!("{}", "No rows imported; batch rolled back.".red());
    } else {
        println!("Imported {} rows.", report.successes);
    }
    for failure in &report.failures {
        println!("  row {}: {}", failure.row, failure.message);
    }
}

pub fn import(db_path: Option<PathBuf>, cmd: ImportCommands) -> Result<()> {
    let mut conn = db::open_db(db_path)?;

    match cmd {
        ImportCommands::Degiro { file } => {
            let reader = File::open(&file).context(format!("Failed to open {:?}", file))?;
            let report = importers::import_degiro_csv(&mut conn, reader)?;
            print_report(&report);
        }
        ImportCommands::Snapshots { file } => {
            let reader = File::open(&file).context(format!("Failed to open {:?}", file))?;
            let report = importers::import_snapshot_csv(&mut conn, reader)?;
            print_report(&report);
        }
    }

    Ok(())
}
