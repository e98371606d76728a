//! CSV import tests: batch semantics, parsing, and post-import cleanup.

use rusqlite::Connection;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use etfolio::db::{self, TransactionType};
use etfolio::importers::{import_degiro_csv, import_snapshot_csv};
use etfolio::snapshots::summarize_snapshots;

fn test_db() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.db");
    db::init_database(Some(path.clone())).expect("init schema");
    let conn = db::open_db(Some(path)).expect("open db");
    (dir, conn)
}

const DEGIRO_HEADER: &str =
    "Date,Time,Product,ISIN,Quantity,Price,Transaction and/or third party fees EUR\n";

#[test]
fn test_degiro_import_mixed_rows() {
    let (_dir, mut conn) = test_db();

    let csv = format!(
        "{}\
         15-01-2024,09:00,VANGUARD FTSE AW,IE00B4L5Y983,10,\"100,00\",\"-1,50\"\n\
         01-03-2024,10:15,VANGUARD FTSE AW,IE00B4L5Y983,-3,\"110,00\",\"-1,50\"\n\
         bad-date,10:15,BROKEN,IE00B4L5Y983,1,\"10,00\",\n",
        DEGIRO_HEADER
    );

    let report = import_degiro_csv(&mut conn, csv.as_bytes()).unwrap();
    assert_eq!(report.successes, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row, 3);
    assert!(!report.rolled_back());

    let stored = db::transactions_for_isin(&conn, "IE00B4L5Y983").unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].transaction_type, TransactionType::Buy);
    assert_eq!(stored[0].units, dec!(10));
    assert_eq!(stored[0].price_per_unit, dec!(100.00));
    assert_eq!(stored[0].fee, dec!(1.50)); // stored absolute
    assert_eq!(stored[0].broker, "DEGIRO");
    assert_eq!(stored[1].transaction_type, TransactionType::Sell);
    assert_eq!(stored[1].units, dec!(3));
}

#[test]
fn test_degiro_import_all_bad_rolls_back() {
    let (_dir, mut conn) = test_db();

    let csv = format!(
        "{}\
         bad,09:00,X,IE00B4L5Y983,10,\"100,00\",\n\
         15-01-2024,09:00,X,NOT-AN-ISIN,10,\"100,00\",\n",
        DEGIRO_HEADER
    );

    let report = import_degiro_csv(&mut conn, csv.as_bytes()).unwrap();
    assert_eq!(report.successes, 0);
    assert_eq!(report.failures.len(), 2);
    assert!(report.rolled_back());
    assert!(db::all_transactions(&conn).unwrap().is_empty());
}

#[test]
fn test_degiro_import_missing_column_fails() {
    let (_dir, mut conn) = test_db();
    let csv = "Date,ISIN,Quantity,Price\n15-01-2024,IE00B4L5Y983,10,\"100,00\"\n";
    assert!(import_degiro_csv(&mut conn, csv.as_bytes()).is_err());
}

#[test]
fn test_degiro_import_closing_batch_drops_market_value() {
    let (_dir, mut conn) = test_db();
    db::upsert_position_value(&conn, "IE00B4L5Y983", dec!(1000.00)).unwrap();

    let csv = format!(
        "{}\
         15-01-2024,09:00,X,IE00B4L5Y983,10,\"100,00\",\n\
         01-06-2024,09:00,X,IE00B4L5Y983,-10,\"120,00\",\n",
        DEGIRO_HEADER
    );
    let report = import_degiro_csv(&mut conn, csv.as_bytes()).unwrap();
    assert_eq!(report.successes, 2);

    // The batch left the position at zero units
    assert!(db::get_position_value(&conn, "IE00B4L5Y983").unwrap().is_none());
}

#[test]
fn test_snapshot_import_and_summaries() {
    let (_dir, mut conn) = test_db();

    let csv = "\
snapshot_date,asset_type,asset_detail,currency,value,exchange_rate,value_eur
2024-01-01T12:00:00,investments,,EUR,100.00,25.00,100.00
2024-01-01T12:00:00,cash_czk,CSOB,CZK,2500.00,25.00,100.00
2024-02-01T12:00:00,investments,,EUR,150.00,24.00,150.00
2024-02-01T12:00:00,cash_czk,CSOB,CZK,2400.00,24.00,100.00
";

    let report = import_snapshot_csv(&mut conn, csv.as_bytes()).unwrap();
    assert_eq!(report.successes, 4);
    assert!(report.failures.is_empty());

    let rows = db::list_snapshots(&conn, None, None, None).unwrap();
    assert_eq!(rows.len(), 4);

    // Imported rows reproduce history: the stored rate stays per row
    let trend = summarize_snapshots(&rows);
    assert_eq!(trend.summaries.len(), 2);
    assert_eq!(trend.summaries[0].total_value_eur, dec!(250.00));
    assert_eq!(trend.summaries[0].exchange_rate_used, dec!(24.00));
    assert_eq!(trend.summaries[1].total_value_eur, dec!(200.00));
    assert_eq!(trend.summaries[1].exchange_rate_used, dec!(25.00));
    assert_eq!(trend.summaries[0].absolute_change_from_oldest, dec!(50.00));
}

#[test]
fn test_snapshot_import_rejects_bad_rows_but_keeps_good_ones() {
    let (_dir, mut conn) = test_db();

    let csv = "\
snapshot_date,asset_type,asset_detail,currency,value,exchange_rate,value_eur
2024-01-01T12:00:00,crypto,,EUR,50.00,25.00,50.00
2024-01-01T12:00:00,crypto,,EURO,50.00,25.00,50.00
2024-01-01T12:00:00,crypto,,EUR,-50.00,25.00,50.00
2024-01-01T12:00:00,crypto,,EUR,50.00,0,50.00
";

    let report = import_snapshot_csv(&mut conn, csv.as_bytes()).unwrap();
    assert_eq!(report.successes, 1);
    assert_eq!(report.failures.len(), 3);
    assert_eq!(db::list_snapshots(&conn, None, None, None).unwrap().len(), 1);
}

#[test]
fn test_snapshot_import_all_bad_rolls_back() {
    let (_dir, mut conn) = test_db();

    let csv = "\
snapshot_date,asset_type,asset_detail,currency,value,exchange_rate,value_eur
not-a-date,crypto,,EUR,50.00,25.00,50.00
";

    let report = import_snapshot_csv(&mut conn, csv.as_bytes()).unwrap();
    assert!(report.rolled_back());
    assert!(db::list_snapshots(&conn, None, None, None).unwrap().is_empty());
}
