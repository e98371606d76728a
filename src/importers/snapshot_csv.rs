//! Generic snapshot CSV importer.
//!
//! Unlike the DEGIRO export, snapshot CSVs carry ISO-8601 dates and
//! plain decimal formatting. Each row is a complete historical snapshot
//! entry including the exchange rate that was in effect, so imported
//! rows reproduce history exactly rather than re-converting at today's
//! rate.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use csv::StringRecord;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;
use tracing::info;

use crate::db::{self, AssetSnapshot};
use crate::error::{Result, TrackerError};

use super::ImportReport;

const COL_SNAPSHOT_DATE: &str = "snapshot_date";
const COL_ASSET_TYPE: &str = "asset_type";
const COL_ASSET_DETAIL: &str = "asset_detail";
const COL_CURRENCY: &str = "currency";
const COL_VALUE: &str = "value";
const COL_EXCHANGE_RATE: &str = "exchange_rate";
const COL_VALUE_EUR: &str = "value_eur";
const COL_CREATED_AT: &str = "created_at";

struct Columns {
    snapshot_date: usize,
    asset_type: usize,
    asset_detail: Option<usize>,
    currency: usize,
    value: usize,
    exchange_rate: usize,
    value_eur: usize,
    created_at: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Columns> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| TrackerError::Parse(format!("missing column '{}'", name)))
        };
        Ok(Columns {
            snapshot_date: required(COL_SNAPSHOT_DATE)?,
            asset_type: required(COL_ASSET_TYPE)?,
            asset_detail: position(COL_ASSET_DETAIL),
            currency: required(COL_CURRENCY)?,
            value: required(COL_VALUE)?,
            exchange_rate: required(COL_EXCHANGE_RATE)?,
            value_eur: required(COL_VALUE_EUR)?,
            created_at: position(COL_CREATED_AT),
        })
    }
}

/// Parse an ISO-8601 datetime; a bare date means midnight.
fn parse_iso_datetime(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(dt) = raw.parse::<NaiveDateTime>() {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(format!("invalid datetime '{}', expected ISO-8601", raw))
}

fn parse_plain_decimal(raw: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("invalid number '{}'", raw))
}

fn field<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("").trim()
}

fn parse_row(
    record: &StringRecord,
    cols: &Columns,
    now: NaiveDateTime,
) -> std::result::Result<AssetSnapshot, String> {
    let snapshot_date = parse_iso_datetime(field(record, cols.snapshot_date))?;

    let asset_type = field(record, cols.asset_type).to_string();
    if asset_type.is_empty() || asset_type.len() > 50 {
        return Err("asset_type must be 1-50 characters".to_string());
    }

    let asset_detail = cols
        .asset_detail
        .map(|idx| field(record, idx))
        .filter(|s| !s.is_empty())
        .map(String::from);
    if let Some(ref detail) = asset_detail {
        if detail.len() > 100 {
            return Err("asset_detail must be at most 100 characters".to_string());
        }
    }

    let currency = field(record, cols.currency).to_uppercase();
    if currency.len() != 3 {
        return Err(format!("invalid currency '{}', expected a 3-letter code", currency));
    }

    let value = parse_plain_decimal(field(record, cols.value))?;
    if value < Decimal::ZERO {
        return Err("value must not be negative".to_string());
    }

    let exchange_rate = parse_plain_decimal(field(record, cols.exchange_rate))?;
    if exchange_rate <= Decimal::ZERO {
        return Err("exchange_rate must be positive".to_string());
    }

    let value_eur = parse_plain_decimal(field(record, cols.value_eur))?;
    if value_eur < Decimal::ZERO {
        return Err("value_eur must not be negative".to_string());
    }

    let created_at = match cols.created_at.map(|idx| field(record, idx)) {
        Some(raw) if !raw.is_empty() => parse_iso_datetime(raw)?,
        _ => now,
    };

    Ok(AssetSnapshot {
        id: None,
        snapshot_date,
        asset_type,
        asset_detail,
        currency,
        value,
        exchange_rate,
        value_eur,
        created_at,
    })
}

/// Import historical snapshot rows. Commits when at least one row
/// inserted; rolls the whole batch back otherwise.
pub fn import_snapshot_csv<R: Read>(conn: &mut Connection, reader: R) -> Result<ImportReport> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let cols = Columns::locate(csv_reader.headers()?)?;

    let now = Utc::now().naive_utc();
    let mut report = ImportReport::default();
    let mut rows: Vec<AssetSnapshot> = Vec::new();

    for (i, record) in csv_reader.records().enumerate() {
        let row_number = i + 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.reject(row_number, format!("unreadable row: {}", e));
                continue;
            }
        };

        match parse_row(&record, &cols, now) {
            Ok(snapshot) => rows.push(snapshot),
            Err(message) => report.reject(row_number, message),
        }
    }

    let tx = conn.transaction()?;
    for snapshot in &rows {
        db::insert_asset_snapshot(&tx, snapshot)?;
        report.successes += 1;
    }

    if report.rolled_back() {
        tx.rollback()?;
    } else {
        tx.commit()?;
    }

    info!(
        imported = report.successes,
        rejected = report.failures.len(),
        "Snapshot import finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cols() -> (StringRecord, Columns) {
        let headers = StringRecord::from(vec![
            COL_SNAPSHOT_DATE,
            COL_ASSET_TYPE,
            COL_ASSET_DETAIL,
            COL_CURRENCY,
            COL_VALUE,
            COL_EXCHANGE_RATE,
            COL_VALUE_EUR,
        ]);
        let located = Columns::locate(&headers).unwrap();
        (headers, located)
    }

    #[test]
    fn test_parse_iso_datetime() {
        assert!(parse_iso_datetime("2024-01-01T12:30:00").is_ok());
        assert!(parse_iso_datetime("2024-01-01 12:30:00").is_ok());
        assert_eq!(
            parse_iso_datetime("2024-01-01").unwrap(),
            "2024-01-01T00:00:00".parse::<NaiveDateTime>().unwrap()
        );
        assert!(parse_iso_datetime("01-01-2024").is_err());
    }

    #[test]
    fn test_parse_valid_row() {
        let (_, cols) = cols();
        let now = Utc::now().naive_utc();
        let record = StringRecord::from(vec![
            "2024-01-01T12:00:00",
            "cash_czk",
            "CSOB",
            "czk",
            "2500.00",
            "25.00",
            "100.00",
        ]);

        let snapshot = parse_row(&record, &cols, now).unwrap();
        assert_eq!(snapshot.asset_type, "cash_czk");
        assert_eq!(snapshot.asset_detail.as_deref(), Some("CSOB"));
        assert_eq!(snapshot.currency, "CZK");
        assert_eq!(snapshot.value, dec!(2500.00));
        assert_eq!(snapshot.exchange_rate, dec!(25.00));
        assert_eq!(snapshot.value_eur, dec!(100.00));
        assert_eq!(snapshot.created_at, now);
    }

    #[test]
    fn test_row_validations() {
        let (_, cols) = cols();
        let now = Utc::now().naive_utc();

        let bad_currency = StringRecord::from(vec![
            "2024-01-01", "crypto", "", "EURO", "10", "25", "10",
        ]);
        assert!(parse_row(&bad_currency, &cols, now).is_err());

        let negative_value = StringRecord::from(vec![
            "2024-01-01", "crypto", "", "EUR", "-10", "25", "10",
        ]);
        assert!(parse_row(&negative_value, &cols, now).is_err());

        let zero_rate = StringRecord::from(vec![
            "2024-01-01", "crypto", "", "EUR", "10", "0", "10",
        ]);
        assert!(parse_row(&zero_rate, &cols, now).is_err());

        let empty_type = StringRecord::from(vec![
            "2024-01-01", "", "", "EUR", "10", "25", "10",
        ]);
        assert!(parse_row(&empty_type, &cols, now).is_err());
    }
}
