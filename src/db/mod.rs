// Database module - SQLite connection and models

pub mod models;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

pub use models::{
    AssetSnapshot, AssetType, Currency, InstrumentKind, IsinMetadata, OtherAsset, PositionValue,
    Transaction, TransactionType,
};

use crate::error::TrackerError;

/// Settings key holding the CZK-per-EUR exchange rate
pub const EXCHANGE_RATE_KEY: &str = "czk_eur_exchange_rate";

/// Rate used when no exchange-rate setting has been stored yet
pub fn default_exchange_rate() -> Decimal {
    Decimal::new(2500, 2) // 25.00
}

/// Pagination defaults
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Get the default database path (~/.etfolio/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let etfolio_dir = PathBuf::from(home).join(".etfolio");

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&etfolio_dir).context("Failed to create .etfolio directory")?;

    Ok(etfolio_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = db_path.unwrap_or(get_default_db_path()?);
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = db_path.unwrap_or(get_default_db_path()?);

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;

    let schema_sql = include_str!("schema.sql");
    conn.execute_batch(schema_sql)
        .context("Failed to execute schema")?;

    info!("Database initialized successfully");
    Ok(())
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Sort field for transaction listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    CreatedAt,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::CreatedAt => "created_at",
        }
    }
}

/// Filters and pagination for transaction listings
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub isin: Option<String>,
    pub broker: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sort_by: SortField,
    pub sort_desc: bool,
    pub offset: usize,
    pub limit: usize,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            isin: None,
            broker: None,
            transaction_type: None,
            start_date: None,
            end_date: None,
            sort_by: SortField::Date,
            sort_desc: true,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TransactionFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(ref isin) = self.isin {
            clauses.push("isin = ?");
            values.push(Value::Text(isin.to_uppercase()));
        }
        if let Some(ref broker) = self.broker {
            clauses.push("broker = ?");
            values.push(Value::Text(broker.clone()));
        }
        if let Some(kind) = self.transaction_type {
            clauses.push("transaction_type = ?");
            values.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(start) = self.start_date {
            clauses.push("date >= ?");
            values.push(Value::Text(start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            clauses.push("date <= ?");
            values.push(Value::Text(end.format("%Y-%m-%d").to_string()));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, date, isin, broker, fee, price_per_unit, units, transaction_type, created_at";

fn map_transaction_row(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: Some(row.get(0)?),
        date: row.get(1)?,
        isin: row.get(2)?,
        broker: row.get(3)?,
        fee: get_decimal_value(row, 4)?,
        price_per_unit: get_decimal_value(row, 5)?,
        units: get_decimal_value(row, 6)?,
        transaction_type: TransactionType::from_str(&row.get::<_, String>(7)?)
            .map_err(|_| invalid_column(7, "transaction_type"))?,
        created_at: row.get(8)?,
    })
}

/// Insert transaction, returns its id
pub fn insert_transaction(conn: &Connection, tx: &Transaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (
            date, isin, broker, fee, price_per_unit, units, transaction_type, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            tx.date,
            tx.isin,
            tx.broker,
            tx.fee.to_string(),
            tx.price_per_unit.to_string(),
            tx.units.to_string(),
            tx.transaction_type.as_str(),
            tx.created_at,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Get a transaction by id
pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE id = ?1",
        TRANSACTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let tx = stmt.query_row([id], map_transaction_row).optional()?;
    Ok(tx)
}

/// Persist the given fields of an existing transaction
pub fn update_transaction(conn: &Connection, tx: &Transaction) -> Result<()> {
    let id = tx
        .id
        .ok_or_else(|| TrackerError::Validation("cannot update unsaved transaction".into()))?;
    conn.execute(
        "UPDATE transactions
         SET date = ?1, isin = ?2, broker = ?3, fee = ?4,
             price_per_unit = ?5, units = ?6, transaction_type = ?7
         WHERE id = ?8",
        params![
            tx.date,
            tx.isin,
            tx.broker,
            tx.fee.to_string(),
            tx.price_per_unit.to_string(),
            tx.units.to_string(),
            tx.transaction_type.as_str(),
            id,
        ],
    )?;
    Ok(())
}

/// Delete a transaction, returns whether a row existed
pub fn delete_transaction(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

/// All transactions for one ISIN, ordered by date ascending
pub fn transactions_for_isin(conn: &Connection, isin: &str) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE isin = ?1 ORDER BY date ASC, id ASC",
        TRANSACTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([isin.to_uppercase()], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Full transaction history, ordered by date ascending
pub fn all_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions ORDER BY date ASC, id ASC",
        TRANSACTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Distinct instrument codes present in the transaction store
pub fn distinct_isins(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT isin FROM transactions ORDER BY isin ASC")?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Filtered, sorted, paginated transaction listing plus total match count
pub fn list_transactions(
    conn: &Connection,
    filter: &TransactionFilter,
) -> Result<(Vec<Transaction>, usize)> {
    let (where_sql, values) = filter.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM transactions{}", where_sql);
    let total: i64 = conn.query_row(&count_sql, params_from_iter(values.iter()), |row| {
        row.get(0)
    })?;

    let order = if filter.sort_desc { "DESC" } else { "ASC" };
    let limit = filter.limit.min(MAX_PAGE_SIZE);
    let sql = format!(
        "SELECT {} FROM transactions{} ORDER BY {} {}, id {} LIMIT {} OFFSET {}",
        TRANSACTION_COLUMNS,
        where_sql,
        filter.sort_by.column(),
        order,
        order,
        limit,
        filter.offset,
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, total as usize))
}

// ---------------------------------------------------------------------------
// ISIN metadata
// ---------------------------------------------------------------------------

const ISIN_METADATA_COLUMNS: &str = "id, isin, name, kind, created_at, updated_at";

fn map_isin_metadata_row(row: &rusqlite::Row) -> rusqlite::Result<IsinMetadata> {
    Ok(IsinMetadata {
        id: Some(row.get(0)?),
        isin: row.get(1)?,
        name: row.get(2)?,
        kind: InstrumentKind::from_str(&row.get::<_, String>(3)?)
            .map_err(|_| invalid_column(3, "kind"))?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Register a new ISIN; an already-registered one surfaces as Conflict
pub fn insert_isin_metadata(conn: &Connection, metadata: &IsinMetadata) -> Result<i64> {
    conn.execute(
        "INSERT INTO isin_metadata (isin, name, kind, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            metadata.isin,
            metadata.name,
            metadata.kind.as_str(),
            metadata.created_at,
            metadata.updated_at,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            anyhow::Error::from(TrackerError::Conflict(format!(
                "metadata for {} already exists",
                metadata.isin
            )))
        }
        other => anyhow::Error::from(other),
    })?;

    Ok(conn.last_insert_rowid())
}

/// Look up metadata for one ISIN
pub fn get_isin_metadata(conn: &Connection, isin: &str) -> Result<Option<IsinMetadata>> {
    let sql = format!(
        "SELECT {} FROM isin_metadata WHERE isin = ?1",
        ISIN_METADATA_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let metadata = stmt
        .query_row([isin.to_uppercase()], map_isin_metadata_row)
        .optional()?;
    Ok(metadata)
}

/// All registered instruments, optionally filtered by kind, ordered by ISIN
pub fn list_isin_metadata(
    conn: &Connection,
    kind: Option<InstrumentKind>,
) -> Result<Vec<IsinMetadata>> {
    let mut clauses = String::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(kind) = kind {
        clauses.push_str(" WHERE kind = ?");
        values.push(Value::Text(kind.as_str().to_string()));
    }
    let sql = format!(
        "SELECT {} FROM isin_metadata{} ORDER BY isin ASC",
        ISIN_METADATA_COLUMNS, clauses
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), map_isin_metadata_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Persist name and kind of an existing registration
pub fn update_isin_metadata(conn: &Connection, metadata: &IsinMetadata) -> Result<()> {
    let id = metadata
        .id
        .ok_or_else(|| TrackerError::Validation("cannot update unsaved metadata".into()))?;
    conn.execute(
        "UPDATE isin_metadata SET name = ?1, kind = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            metadata.name,
            metadata.kind.as_str(),
            metadata.updated_at,
            id,
        ],
    )?;
    Ok(())
}

/// Delete a registration, returns whether a row existed
pub fn delete_isin_metadata(conn: &Connection, isin: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM isin_metadata WHERE isin = ?1",
        [isin.to_uppercase()],
    )?;
    Ok(deleted > 0)
}

// ---------------------------------------------------------------------------
// Position values
// ---------------------------------------------------------------------------

fn map_position_value_row(row: &rusqlite::Row) -> rusqlite::Result<PositionValue> {
    Ok(PositionValue {
        id: Some(row.get(0)?),
        isin: row.get(1)?,
        current_value: get_decimal_value(row, 2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Create or update the stored market value for an ISIN
pub fn upsert_position_value(
    conn: &Connection,
    isin: &str,
    current_value: Decimal,
) -> Result<PositionValue> {
    let now = Utc::now().naive_utc();
    let existing = get_position_value(conn, isin)?;

    match existing {
        Some(mut pv) => {
            conn.execute(
                "UPDATE position_values SET current_value = ?1, updated_at = ?2 WHERE isin = ?3",
                params![current_value.to_string(), now, isin],
            )?;
            pv.current_value = current_value;
            pv.updated_at = now;
            Ok(pv)
        }
        None => {
            conn.execute(
                "INSERT INTO position_values (isin, current_value, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![isin, current_value.to_string(), now, now],
            )?;
            Ok(PositionValue {
                id: Some(conn.last_insert_rowid()),
                isin: isin.to_string(),
                current_value,
                created_at: now,
                updated_at: now,
            })
        }
    }
}

/// Look up a position value by ISIN
pub fn get_position_value(conn: &Connection, isin: &str) -> Result<Option<PositionValue>> {
    let mut stmt = conn.prepare(
        "SELECT id, isin, current_value, created_at, updated_at
         FROM position_values WHERE isin = ?1",
    )?;
    let pv = stmt
        .query_row([isin.to_uppercase()], map_position_value_row)
        .optional()?;
    Ok(pv)
}

/// All position values, ordered by ISIN
pub fn all_position_values(conn: &Connection) -> Result<Vec<PositionValue>> {
    let mut stmt = conn.prepare(
        "SELECT id, isin, current_value, created_at, updated_at
         FROM position_values ORDER BY isin ASC",
    )?;
    let rows = stmt
        .query_map([], map_position_value_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete a position value, returns whether a row existed
pub fn delete_position_value(conn: &Connection, isin: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM position_values WHERE isin = ?1",
        [isin.to_uppercase()],
    )?;
    Ok(deleted > 0)
}

// ---------------------------------------------------------------------------
// Other assets
// ---------------------------------------------------------------------------

fn map_other_asset_row(row: &rusqlite::Row) -> rusqlite::Result<OtherAsset> {
    Ok(OtherAsset {
        id: Some(row.get(0)?),
        asset_type: AssetType::from_str(&row.get::<_, String>(1)?)
            .map_err(|_| invalid_column(1, "asset_type"))?,
        asset_detail: row.get(2)?,
        currency: Currency::from_str(&row.get::<_, String>(3)?)
            .map_err(|_| invalid_column(3, "currency"))?,
        value: get_decimal_value(row, 4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const OTHER_ASSET_COLUMNS: &str =
    "id, asset_type, asset_detail, currency, value, created_at, updated_at";

/// Find an asset by its (asset_type, asset_detail) key; detail may be NULL
pub fn find_other_asset(
    conn: &Connection,
    asset_type: AssetType,
    asset_detail: Option<&str>,
) -> Result<Option<OtherAsset>> {
    let sql = format!(
        "SELECT {} FROM other_assets WHERE asset_type = ?1 AND asset_detail IS ?2",
        OTHER_ASSET_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let asset = stmt
        .query_row(params![asset_type.as_str(), asset_detail], map_other_asset_row)
        .optional()?;
    Ok(asset)
}

/// Insert a new asset row; unique-key violations surface as Conflict
pub fn insert_other_asset(conn: &Connection, asset: &OtherAsset) -> Result<i64> {
    conn.execute(
        "INSERT INTO other_assets (asset_type, asset_detail, currency, value, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            asset.asset_type.as_str(),
            asset.asset_detail,
            asset.currency.as_str(),
            asset.value.to_string(),
            asset.created_at,
            asset.updated_at,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            anyhow::Error::from(TrackerError::Conflict(format!(
                "asset ({}, {:?}) already exists",
                asset.asset_type.as_str(),
                asset.asset_detail
            )))
        }
        other => anyhow::Error::from(other),
    })?;

    Ok(conn.last_insert_rowid())
}

/// Update value and currency of an existing asset row
pub fn update_other_asset(conn: &Connection, asset: &OtherAsset) -> Result<()> {
    let id = asset
        .id
        .ok_or_else(|| TrackerError::Validation("cannot update unsaved asset".into()))?;
    conn.execute(
        "UPDATE other_assets SET currency = ?1, value = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            asset.currency.as_str(),
            asset.value.to_string(),
            asset.updated_at,
            id,
        ],
    )?;
    Ok(())
}

/// All stored assets, ordered by asset_type then asset_detail
pub fn all_other_assets(conn: &Connection) -> Result<Vec<OtherAsset>> {
    let sql = format!(
        "SELECT {} FROM other_assets ORDER BY asset_type ASC, asset_detail ASC",
        OTHER_ASSET_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], map_other_asset_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete an asset by key, returns whether a row existed
pub fn delete_other_asset(
    conn: &Connection,
    asset_type: AssetType,
    asset_detail: Option<&str>,
) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM other_assets WHERE asset_type = ?1 AND asset_detail IS ?2",
        params![asset_type.as_str(), asset_detail],
    )?;
    Ok(deleted > 0)
}

// ---------------------------------------------------------------------------
// Asset snapshots
// ---------------------------------------------------------------------------

const SNAPSHOT_COLUMNS: &str = "id, snapshot_date, asset_type, asset_detail, currency, value, exchange_rate, value_eur, created_at";

fn map_snapshot_row(row: &rusqlite::Row) -> rusqlite::Result<AssetSnapshot> {
    Ok(AssetSnapshot {
        id: Some(row.get(0)?),
        snapshot_date: row.get(1)?,
        asset_type: row.get(2)?,
        asset_detail: row.get(3)?,
        currency: row.get(4)?,
        value: get_decimal_value(row, 5)?,
        exchange_rate: get_decimal_value(row, 6)?,
        value_eur: get_decimal_value(row, 7)?,
        created_at: row.get(8)?,
    })
}

/// Insert one snapshot row, returns its id
pub fn insert_asset_snapshot(conn: &Connection, snapshot: &AssetSnapshot) -> Result<i64> {
    conn.execute(
        "INSERT INTO asset_snapshots (
            snapshot_date, asset_type, asset_detail, currency,
            value, exchange_rate, value_eur, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            snapshot.snapshot_date,
            snapshot.asset_type,
            snapshot.asset_detail,
            snapshot.currency,
            snapshot.value.to_string(),
            snapshot.exchange_rate.to_string(),
            snapshot.value_eur.to_string(),
            snapshot.created_at,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Snapshot rows filtered by inclusive date range and asset type,
/// ordered snapshot_date DESC, asset_type ASC
pub fn list_snapshots(
    conn: &Connection,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    asset_type: Option<&str>,
) -> Result<Vec<AssetSnapshot>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(start) = start {
        clauses.push("snapshot_date >= ?");
        values.push(Value::Text(format_datetime(start)));
    }
    if let Some(end) = end {
        clauses.push("snapshot_date <= ?");
        values.push(Value::Text(format_datetime(end)));
    }
    if let Some(asset_type) = asset_type {
        clauses.push("asset_type = ?");
        values.push(Value::Text(asset_type.to_string()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM asset_snapshots{} ORDER BY snapshot_date DESC, asset_type ASC",
        SNAPSHOT_COLUMNS, where_sql
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), map_snapshot_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Snapshot rows sharing exactly one capture datetime, ordered by asset_type
pub fn snapshots_on(conn: &Connection, snapshot_date: NaiveDateTime) -> Result<Vec<AssetSnapshot>> {
    let sql = format!(
        "SELECT {} FROM asset_snapshots WHERE snapshot_date = ?1 ORDER BY asset_type ASC",
        SNAPSHOT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([snapshot_date], map_snapshot_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete all rows sharing one capture datetime, returns the count
pub fn delete_snapshots_on(conn: &Connection, snapshot_date: NaiveDateTime) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM asset_snapshots WHERE snapshot_date = ?1",
        [snapshot_date],
    )?;
    Ok(deleted)
}

/// Wipe the snapshot table, returns the count
pub fn delete_all_snapshots(conn: &Connection) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM asset_snapshots", [])?;
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Read a raw setting value
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
    let value = stmt.query_row([key], |row| row.get(0)).optional()?;
    Ok(value)
}

/// Create or overwrite a setting
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
        params![key, value, now],
    )?;
    Ok(())
}

/// Current CZK-per-EUR rate; 25.00 when no setting is stored
pub fn get_exchange_rate(conn: &Connection) -> Result<Decimal> {
    match get_setting(conn, EXCHANGE_RATE_KEY)? {
        Some(raw) => Decimal::from_str(&raw)
            .map_err(|_| TrackerError::Parse(format!("stored exchange rate '{}'", raw)).into()),
        None => Ok(default_exchange_rate()),
    }
}

/// Store the CZK-per-EUR rate
pub fn set_exchange_rate(conn: &Connection, rate: Decimal) -> Result<()> {
    if rate <= Decimal::ZERO {
        return Err(TrackerError::Validation("exchange rate must be positive".into()).into());
    }
    let old = get_setting(conn, EXCHANGE_RATE_KEY)?;
    set_setting(conn, EXCHANGE_RATE_KEY, &rate.to_string())?;
    info!(
        old_value = old.as_deref().unwrap_or("<unset>"),
        new_value = %rate,
        "Exchange rate setting updated"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// rusqlite's chrono encoding for NaiveDateTime parameters
fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn invalid_column(idx: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, name.to_string(), rusqlite::types::Type::Text)
}

/// Helper to read Decimal from SQLite (handles both INTEGER and TEXT)
pub(crate) fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    // Try to get as String first (for TEXT storage)
    if let Ok(s) = row.get::<_, String>(idx) {
        return Decimal::from_str(&s)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)));
    }

    // Fall back to i64 (for INTEGER storage due to SQLite type affinity)
    if let Ok(i) = row.get::<_, i64>(idx) {
        return Ok(Decimal::from(i));
    }

    // Try f64 for floating point values
    if let Ok(f) = row.get::<_, f64>(idx) {
        return Decimal::try_from(f)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)));
    }

    Err(invalid_column(idx, "decimal"))
}
