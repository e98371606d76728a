//! Point-in-time asset snapshots with CZK/EUR conversion.
//!
//! A snapshot captures every asset (the computed investments total plus
//! all stored assets) as one row each, sharing a single capture datetime
//! and the exchange rate in effect at creation. The rate is frozen into
//! the rows; later rate changes never touch existing snapshots.

pub mod summary;

use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::assets;
use crate::db::{self, AssetSnapshot};
use crate::error::{Result, TrackerError};

pub use summary::{summarize_snapshots, SnapshotSummary, SnapshotTrend};

/// What a snapshot run captured.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMetadata {
    pub snapshot_date: NaiveDateTime,
    pub exchange_rate_used: Decimal,
    pub total_assets_captured: usize,
    pub total_value_eur: Decimal,
}

/// Convert a native-currency value to EUR at the given CZK-per-EUR rate.
/// EUR values pass through untouched.
pub fn value_in_eur(value: Decimal, currency: &str, rate: Decimal) -> Decimal {
    if currency == "EUR" {
        value
    } else {
        value / rate
    }
}

/// Capture every asset as of `timestamp` (now when omitted).
///
/// The rows are written in one database transaction: a snapshot event
/// exists in full or not at all, never as a partial set of rows.
pub fn create_snapshot(
    conn: &mut Connection,
    timestamp: Option<NaiveDateTime>,
) -> Result<(Vec<AssetSnapshot>, SnapshotMetadata)> {
    let now = Utc::now().naive_utc();
    let snapshot_date = timestamp.unwrap_or(now);

    let (captured, rate) = assets::capture_assets(conn)?;

    let mut rows = Vec::with_capacity(captured.len());
    let mut total_value_eur = Decimal::ZERO;

    let tx = conn.transaction()?;
    for asset in &captured {
        let currency = asset.currency().as_str();
        let value_eur = value_in_eur(asset.value(), currency, rate);
        total_value_eur += value_eur;

        let mut row = AssetSnapshot {
            id: None,
            snapshot_date,
            asset_type: asset.asset_type_str().to_string(),
            asset_detail: asset.asset_detail().map(String::from),
            currency: currency.to_string(),
            value: asset.value(),
            exchange_rate: rate,
            value_eur,
            created_at: now,
        };
        row.id = Some(db::insert_asset_snapshot(&tx, &row)?);
        rows.push(row);
    }
    tx.commit()?;

    let metadata = SnapshotMetadata {
        snapshot_date,
        exchange_rate_used: rate,
        total_assets_captured: rows.len(),
        total_value_eur,
    };

    info!(
        snapshot_date = %snapshot_date,
        exchange_rate = %rate,
        assets = rows.len(),
        total_value_eur = %total_value_eur,
        "Asset snapshot created"
    );

    Ok((rows, metadata))
}

/// Snapshot rows, optionally filtered by inclusive date range and asset
/// type, newest first.
pub fn get_snapshots(
    conn: &Connection,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    asset_type: Option<&str>,
) -> Result<Vec<AssetSnapshot>> {
    db::list_snapshots(conn, start, end, asset_type)
}

/// Delete every row captured at exactly `snapshot_date`.
pub fn delete_snapshots_by_date(conn: &Connection, snapshot_date: NaiveDateTime) -> Result<usize> {
    let deleted = db::delete_snapshots_on(conn, snapshot_date)?;
    if deleted == 0 {
        return Err(
            TrackerError::NotFound(format!("snapshot at {}", snapshot_date)).into(),
        );
    }
    info!(snapshot_date = %snapshot_date, rows = deleted, "Snapshot deleted");
    Ok(deleted)
}

/// Wipe the snapshot history, returning how many rows were removed.
pub fn delete_all_snapshots(conn: &Connection) -> Result<usize> {
    let deleted = db::delete_all_snapshots(conn)?;
    info!(rows = deleted, "All snapshots deleted");
    Ok(deleted)
}
