//! DEGIRO transaction export importer.
//!
//! DEGIRO CSVs use DD-MM-YYYY dates, European decimal formatting
//! (`1.234,56`), and signed quantities where a negative quantity marks a
//! sale. Fees can be negative (a charge) or missing; their absolute
//! value is stored.

use chrono::NaiveDate;
use csv::StringRecord;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::io::Read;
use std::str::FromStr;
use tracing::info;

use crate::analytics;
use crate::db::{self, TransactionType};
use crate::error::{Result, TrackerError};
use crate::transactions::{
    reconcile_positions, NewTransaction, PositionStateChanged,
};

use super::ImportReport;

const BROKER: &str = "DEGIRO";

const COL_DATE: &str = "Date";
const COL_ISIN: &str = "ISIN";
const COL_QUANTITY: &str = "Quantity";
const COL_PRICE: &str = "Price";
const COL_FEE: &str = "Transaction and/or third party fees EUR";

struct Columns {
    date: usize,
    isin: usize,
    quantity: usize,
    price: usize,
    fee: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Columns> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| TrackerError::Parse(format!("missing column '{}'", name)))
        };
        Ok(Columns {
            date: find(COL_DATE)?,
            isin: find(COL_ISIN)?,
            quantity: find(COL_QUANTITY)?,
            price: find(COL_PRICE)?,
            fee: find(COL_FEE)?,
        })
    }
}

/// Parse a European-formatted decimal: `.` thousands, `,` decimal point.
pub fn parse_eu_decimal(raw: &str) -> std::result::Result<Decimal, String> {
    let cleaned = raw.trim().replace('.', "").replace(',', ".");
    if cleaned.is_empty() {
        return Err(format!("empty number '{}'", raw));
    }
    Decimal::from_str(&cleaned).map_err(|_| format!("invalid number '{}'", raw))
}

fn parse_degiro_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%d-%m-%Y")
        .map_err(|_| format!("invalid date '{}', expected DD-MM-YYYY", raw))
}

fn field<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("").trim()
}

fn parse_row(record: &StringRecord, cols: &Columns) -> std::result::Result<NewTransaction, String> {
    let date = parse_degiro_date(field(record, cols.date))?;

    let quantity = parse_eu_decimal(field(record, cols.quantity))?;
    if quantity == Decimal::ZERO {
        return Err("quantity must not be zero".to_string());
    }
    let transaction_type = if quantity < Decimal::ZERO {
        TransactionType::Sell
    } else {
        TransactionType::Buy
    };

    let price = parse_eu_decimal(field(record, cols.price))?;

    let fee_raw = field(record, cols.fee);
    let fee = if fee_raw.is_empty() {
        Decimal::ZERO
    } else {
        parse_eu_decimal(fee_raw)?.abs()
    };

    Ok(NewTransaction {
        date,
        isin: field(record, cols.isin).to_string(),
        broker: BROKER.to_string(),
        fee,
        price_per_unit: price,
        units: quantity.abs(),
        transaction_type,
    })
}

/// Import a DEGIRO transaction export. Commits when at least one row
/// inserted; rolls the whole batch back otherwise. After a successful
/// commit, positions the batch drove to zero units lose their stored
/// market value.
pub fn import_degiro_csv<R: Read>(conn: &mut Connection, reader: R) -> Result<ImportReport> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let cols = Columns::locate(csv_reader.headers()?)?;

    let mut report = ImportReport::default();
    let mut rows: Vec<NewTransaction> = Vec::new();

    for (i, record) in csv_reader.records().enumerate() {
        let row_number = i + 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.reject(row_number, format!("unreadable row: {}", e));
                continue;
            }
        };

        let parsed = parse_row(&record, &cols)
            .map_err(TrackerError::Validation)
            .and_then(|new| new.validated().map_err(|e| TrackerError::Validation(e.to_string())));
        match parsed {
            Ok(new) => rows.push(new),
            Err(e) => report.reject(row_number, e.to_string()),
        }
    }

    let mut affected: BTreeSet<String> = BTreeSet::new();
    {
        let tx = conn.transaction()?;
        for new in &rows {
            let created_at = chrono::Utc::now().naive_utc();
            let stored = db::Transaction {
                id: None,
                date: new.date,
                isin: new.isin.clone(),
                broker: new.broker.clone(),
                fee: new.fee,
                price_per_unit: new.price_per_unit,
                units: new.units,
                transaction_type: new.transaction_type,
                created_at,
            };
            db::insert_transaction(&tx, &stored)?;
            affected.insert(new.isin.clone());
            report.successes += 1;
        }

        if report.rolled_back() {
            tx.rollback()?;
        } else {
            tx.commit()?;
        }
    }

    if !report.rolled_back() {
        let mut events = Vec::new();
        for isin in &affected {
            let units = analytics::cost_basis_for(conn, isin, None)?
                .map(|b| b.total_units)
                .unwrap_or(Decimal::ZERO);
            if units == Decimal::ZERO {
                events.push(PositionStateChanged::Closed { isin: isin.clone() });
            }
        }
        reconcile_positions(conn, &events);
    }

    info!(
        imported = report.successes,
        rejected = report.failures.len(),
        "DEGIRO import finished"
    );

    Ok(report)
}
